use anyhow::Result;
use gpt_gulp_schemas::{Conversation, Timestamp, DEFAULT_PROJECT, UNKNOWN_DURATION};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

const MAX_SUMMARY_LINES: usize = 3;
const MAX_FALLBACK_SUMMARY_LINES: usize = 2;
const MAX_KEY_POINTS: usize = 10;
const MAX_SENTENCE_KEY_POINTS: usize = 5;
const MAX_RESOURCES: usize = 20;
const MAX_TOPIC_CHARS: usize = 50;

const FALLBACK_SUMMARY: &str = "AI conversation";
const FALLBACK_TOPIC: &str = "conversation";

/// Ordered project taxonomy; the first entry with any keyword hit wins
const PROJECT_TAXONOMY: &[(&str, &[&str])] = &[
    ("portfolio", &["portfolio", "personal website", "resume"]),
    ("todo-app", &["todo", "task", "reminder"]),
    ("consulting", &["consulting", "client", "business"]),
    ("mlb", &["baseball", "mlb", "home run", "sports"]),
    ("water-cycle", &["water", "cycle", "environment"]),
    ("case-study", &["case study", "analysis", "research"]),
];

const TECH_TAXONOMY: &[(&str, &[&str])] = &[
    ("python", &["python", "py", "django", "flask"]),
    ("javascript", &["javascript", "js", "node", "react", "vue"]),
    ("web", &["html", "css", "web", "frontend", "backend"]),
    ("ai", &["ai", "artificial intelligence", "machine learning", "ml"]),
    ("data", &["data", "analysis", "visualization", "csv"]),
    ("git", &["git", "github", "version control"]),
    ("deployment", &["deploy", "netlify", "aws", "hosting"]),
];

const ACTIVITY_TAXONOMY: &[(&str, &[&str])] = &[
    ("development", &["create", "build", "develop"]),
    ("debugging", &["fix", "debug", "error", "issue"]),
    ("help", &["help", "how", "question"]),
];

const SUMMARY_PREFIXES: &[&str] = &["I need", "How", "Can you"];
const SUMMARY_KEYWORDS: &[&str] = &["implement", "create", "build"];
const KEY_POINT_MARKERS: &[&str] = &["TODO:", "ACTION:"];
const KEY_SENTENCE_WORDS: &[&str] = &["will", "should", "need"];

/// Anything that can turn a stored conversation into an enriched one.
///
/// The sync loop is written against this seam so a failing record can be
/// isolated without knowing which processor produced the failure.
pub trait ConversationProcessor: Send + Sync {
    fn process(&self, conversation: &Conversation) -> Result<Conversation>;
}

/// Heuristic enrichment: summary, key points, project, topic, tags and
/// referenced resources derived from plain text rules
pub struct HeuristicEnricher {
    bullet_pattern: Regex,
    numbered_pattern: Regex,
    sentence_split: Regex,
    resource_patterns: Vec<Regex>,
}

impl Default for HeuristicEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationProcessor for HeuristicEnricher {
    fn process(&self, conversation: &Conversation) -> Result<Conversation> {
        Ok(self.enrich(conversation))
    }
}

impl HeuristicEnricher {
    pub fn new() -> Self {
        Self {
            bullet_pattern: Regex::new(r"^[-*•]\s+").expect("bullet pattern"),
            numbered_pattern: Regex::new(r"^\d+\.\s+").expect("numbered pattern"),
            sentence_split: Regex::new(r"[.!?]+").expect("sentence pattern"),
            resource_patterns: vec![
                // Files with extensions
                Regex::new(r"[a-zA-Z0-9_/-]+\.[a-zA-Z]{2,4}").expect("file pattern"),
                // Inline code spans often hold file names
                Regex::new(r"`[^`]+`").expect("code span pattern"),
                // URLs
                Regex::new(r#"https?://[^\s<>"']+|www\.[^\s<>"']+\.[a-zA-Z]{2,}"#)
                    .expect("url pattern"),
            ],
        }
    }

    /// Enrich a conversation. Deterministic in everything but `processed_at`.
    pub fn enrich(&self, conversation: &Conversation) -> Conversation {
        let content = conversation.raw_content.as_str();
        let source_file = conversation.source_file.as_deref().unwrap_or("");

        let project = self.detect_project(content, source_file);
        let mut enriched = conversation.clone();

        enriched.summary = self.generate_summary(content);
        enriched.key_points = self.extract_key_points(content);
        enriched.topic = self.extract_topic(&conversation.title, content);
        enriched.tags = self.generate_tags(content, &conversation.platform, &project);
        enriched.resources = self.extract_resources(content);
        enriched.duration = UNKNOWN_DURATION.to_string();
        enriched.project = project;
        enriched.processed = true;
        enriched.processed_at = Some(Timestamp::now());

        debug!(
            "Enriched conversation {}: project={}, {} tags, {} key points, {} resources",
            enriched.id,
            enriched.project,
            enriched.tags.len(),
            enriched.key_points.len(),
            enriched.resources.len()
        );

        enriched
    }

    /// Extractive summary built from question-like or intent-bearing lines
    pub fn generate_summary(&self, content: &str) -> String {
        let important: Vec<&str> = trimmed_lines(content)
            .filter(|line| {
                let len = char_len(line);
                (20..200).contains(&len) && is_summary_line(line)
            })
            .take(MAX_SUMMARY_LINES)
            .collect();

        if !important.is_empty() {
            return important.join(" ");
        }

        let meaningful: Vec<&str> = trimmed_lines(content)
            .filter(|line| char_len(line) > 20)
            .take(MAX_FALLBACK_SUMMARY_LINES)
            .collect();

        if meaningful.is_empty() {
            FALLBACK_SUMMARY.to_string()
        } else {
            meaningful.join(" ")
        }
    }

    /// List items and explicit markers, falling back to action-flavoured
    /// sentences when the text has no list structure
    pub fn extract_key_points(&self, content: &str) -> Vec<String> {
        let mut key_points: Vec<String> = trimmed_lines(content)
            .filter(|line| {
                let upper = line.to_uppercase();
                self.bullet_pattern.is_match(line)
                    || self.numbered_pattern.is_match(line)
                    || KEY_POINT_MARKERS.iter().any(|marker| upper.contains(marker))
            })
            .map(str::to_string)
            .collect();

        if key_points.is_empty() {
            key_points = self
                .sentence_split
                .split(content)
                .map(str::trim)
                .filter(|sentence| {
                    char_len(sentence) > 30
                        && KEY_SENTENCE_WORDS.iter().any(|word| sentence.contains(word))
                })
                .take(MAX_SENTENCE_KEY_POINTS)
                .map(str::to_string)
                .collect();
        }

        key_points.truncate(MAX_KEY_POINTS);
        key_points
    }

    pub fn detect_project(&self, content: &str, source_file: &str) -> String {
        let content = content.to_lowercase();
        let source_file = source_file.to_lowercase();

        PROJECT_TAXONOMY
            .iter()
            .find(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|keyword| content.contains(keyword) || source_file.contains(keyword))
            })
            .map(|(project, _)| project.to_string())
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string())
    }

    pub fn extract_topic(&self, title: &str, content: &str) -> String {
        if char_len(title) > 5 {
            return truncate_chars(title, MAX_TOPIC_CHARS);
        }

        trimmed_lines(content)
            .find(|line| (10..100).contains(&char_len(line)))
            .map(|line| truncate_chars(line, MAX_TOPIC_CHARS))
            .unwrap_or_else(|| FALLBACK_TOPIC.to_string())
    }

    pub fn generate_tags(&self, content: &str, platform: &str, project: &str) -> BTreeSet<String> {
        let content = content.to_lowercase();
        let mut tags = BTreeSet::new();

        for seed in [platform, project] {
            if !seed.is_empty() {
                tags.insert(seed.to_string());
            }
        }

        for (tag, keywords) in TECH_TAXONOMY.iter().chain(ACTIVITY_TAXONOMY) {
            if keywords.iter().any(|keyword| content.contains(keyword)) {
                tags.insert(tag.to_string());
            }
        }

        tags
    }

    /// File names, inline code spans and URLs, in pattern order then text
    /// order, deduplicated on first sight
    pub fn extract_resources(&self, content: &str) -> Vec<String> {
        let mut resources: Vec<String> = Vec::new();

        let candidates = self
            .resource_patterns
            .iter()
            .flat_map(|pattern| pattern.find_iter(content).map(|m| m.as_str()));

        for candidate in candidates {
            let cleaned = candidate.trim_matches(|c| c == '`' || c == '"' || c == '\'');
            if char_len(cleaned) > 3 && !resources.iter().any(|r| r == cleaned) {
                resources.push(cleaned.to_string());
            }
        }

        resources.truncate(MAX_RESOURCES);
        resources
    }
}

// Helper functions

fn trimmed_lines(content: &str) -> impl Iterator<Item = &str> {
    content.split('\n').map(str::trim)
}

fn is_summary_line(line: &str) -> bool {
    if line.ends_with('?') || SUMMARY_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return true;
    }

    let lower = line.to_lowercase();
    SUMMARY_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
