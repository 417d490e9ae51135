//! Rule Card Loader - parses and validates Rule Card files.
//!
//! YAML is read into a plain value tree (scalars, mappings, sequences) and
//! checked field by field before any typed card is built. A card that
//! violates the schema anywhere is rejected as a whole.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use walkdir::WalkDir;

use crate::domain::{LoadedCard, RuleCard, Severity, Verify};
use crate::error::{CompileError, CompileResult};

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]*(-[A-Z][A-Z0-9]*)+-[0-9]{3}$").expect("valid id regex")
});

const KNOWN_FIELDS: [&str; 10] = [
    "id",
    "title",
    "severity",
    "scope",
    "requirement",
    "do",
    "dont",
    "detect",
    "verify",
    "refs",
];

/// Immutable view of every Rule Card discovered under a root.
///
/// Built once per run and passed by reference to the rest of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    root: PathBuf,
    cards: BTreeMap<PathBuf, LoadedCard>,
    rejected: BTreeMap<PathBuf, String>,
}

impl Corpus {
    /// Canonical corpus root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Accepted cards keyed by canonical path.
    pub fn cards(&self) -> impl Iterator<Item = &LoadedCard> {
        self.cards.values()
    }

    pub fn get(&self, path: &Path) -> Option<&LoadedCard> {
        self.cards.get(path)
    }

    /// Reason a card file was rejected, if it was.
    pub fn rejection(&self, path: &Path) -> Option<&str> {
        self.rejected.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Corpus plus every file-level error found while building it.
#[derive(Debug)]
pub struct CorpusLoad {
    pub corpus: Corpus,
    pub errors: Vec<CompileError>,
}

impl CorpusLoad {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Load and validate every Rule Card under `root`.
///
/// `root` may be a directory (walked recursively for `.yml`/`.yaml` files) or
/// a single card file. Only an unusable root is returned as `Err`; per-file
/// failures are collected in [`CorpusLoad::errors`].
pub fn load_corpus(root: &Path) -> CompileResult<CorpusLoad> {
    let canonical = root
        .canonicalize()
        .map_err(|e| CompileError::io(root, e))?;
    let corpus_root = if canonical.is_file() {
        canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| canonical.clone())
    } else {
        canonical.clone()
    };

    let mut corpus = Corpus {
        root: corpus_root,
        ..Corpus::default()
    };
    let mut errors = Vec::new();

    let walker = WalkDir::new(&canonical)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| canonical.clone());
                errors.push(CompileError::io(&path, std::io::Error::other(e)));
                continue;
            }
        };

        // A file named directly is always validated, whatever its extension.
        if !entry.file_type().is_file() || (entry.depth() > 0 && !is_card_file(entry.path())) {
            continue;
        }

        let path = entry.path().to_path_buf();
        match load_card(&path) {
            Ok(card) => {
                tracing::debug!(file = %path.display(), id = %card.id(), "Rule Card accepted");
                corpus.cards.insert(path, card);
            }
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "Rule Card rejected");
                corpus.rejected.insert(path, e.to_string());
                errors.push(e);
            }
        }
    }

    errors.extend(reject_conflicting_ids(&mut corpus));

    tracing::info!(
        root = %corpus.root.display(),
        accepted = corpus.cards.len(),
        rejected = corpus.rejected.len(),
        "Corpus loaded"
    );

    Ok(CorpusLoad { corpus, errors })
}

/// Read and validate a single Rule Card file.
pub fn load_card(path: &Path) -> CompileResult<LoadedCard> {
    let raw = std::fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
    let card = parse_card(path, &raw)?;
    Ok(LoadedCard {
        card,
        path: path.to_path_buf(),
        raw,
    })
}

/// Parse and validate Rule Card YAML. `file` is used only for error attribution.
pub fn parse_card(file: &Path, raw: &str) -> CompileResult<RuleCard> {
    let value: Value = serde_yaml::from_str(raw).map_err(|e| CompileError::Parse {
        file: file.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })?;

    reject_tags(file, &value, "")?;

    let map = value
        .as_mapping()
        .ok_or_else(|| CompileError::schema(file, "<root>", "Rule Card must be a mapping"))?;

    for key in map.keys() {
        match key.as_str() {
            Some(k) if KNOWN_FIELDS.contains(&k) => {}
            Some(k) => tracing::debug!(file = %file.display(), field = k, "Ignoring unknown field"),
            None => {
                return Err(CompileError::schema(
                    file,
                    "<root>",
                    "top-level keys must be strings",
                ))
            }
        }
    }

    let fields = FieldReader { file, map };

    let id = fields.string("id")?;
    if !ID_PATTERN.is_match(&id) {
        return Err(CompileError::schema(
            file,
            "id",
            format!("'{id}' does not match DOMAIN-TOPIC-NNN"),
        ));
    }

    let title = fields.string("title")?;
    let severity = fields
        .string("severity")?
        .parse::<Severity>()
        .map_err(|reason| CompileError::schema(file, "severity", reason))?;
    let scope = fields.string("scope")?;
    let requirement = fields.string("requirement")?;
    let dos = fields.string_list("do")?;
    let dont = fields.string_list("dont")?;
    let detect = fields.list_map("detect")?;
    let verify = fields.verify()?;
    let refs = fields.list_map("refs")?;

    Ok(RuleCard {
        id,
        title,
        severity,
        scope,
        requirement,
        dos,
        dont,
        detect,
        verify,
        refs,
    })
}

/// Typed accessors over the top-level card mapping.
struct FieldReader<'a> {
    file: &'a Path,
    map: &'a Mapping,
}

impl FieldReader<'_> {
    fn required(&self, field: &str) -> CompileResult<&Value> {
        match self.map.get(field) {
            Some(Value::Null) | None => Err(CompileError::schema(
                self.file,
                field,
                "missing required field",
            )),
            Some(value) => Ok(value),
        }
    }

    fn string(&self, field: &str) -> CompileResult<String> {
        match self.required(field)? {
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            Value::String(_) => Err(CompileError::schema(self.file, field, "must not be empty")),
            other => Err(CompileError::schema(
                self.file,
                field,
                format!("expected a string, found {}", kind(other)),
            )),
        }
    }

    fn string_list(&self, field: &str) -> CompileResult<Vec<String>> {
        string_list_at(self.file, self.required(field)?, field)
    }

    fn list_map(&self, field: &str) -> CompileResult<BTreeMap<String, Vec<String>>> {
        let value = self.required(field)?;
        let mapping = value.as_mapping().ok_or_else(|| {
            CompileError::schema(
                self.file,
                field,
                format!("expected a mapping, found {}", kind(value)),
            )
        })?;
        if mapping.is_empty() {
            return Err(CompileError::schema(self.file, field, "must not be empty"));
        }

        let mut out = BTreeMap::new();
        for (key, entries) in mapping {
            let name = key.as_str().ok_or_else(|| {
                CompileError::schema(self.file, field, "keys must be strings")
            })?;
            let path = format!("{field}.{name}");
            out.insert(name.to_string(), string_list_at(self.file, entries, &path)?);
        }
        Ok(out)
    }

    fn verify(&self) -> CompileResult<Verify> {
        let value = self.required("verify")?;
        let mapping = value.as_mapping().ok_or_else(|| {
            CompileError::schema(
                self.file,
                "verify",
                format!("expected a mapping, found {}", kind(value)),
            )
        })?;
        let tests = match mapping.get("tests") {
            Some(Value::Null) | None => {
                return Err(CompileError::schema(
                    self.file,
                    "verify.tests",
                    "missing required field",
                ))
            }
            Some(tests) => string_list_at(self.file, tests, "verify.tests")?,
        };
        Ok(Verify { tests })
    }
}

fn string_list_at(file: &Path, value: &Value, field: &str) -> CompileResult<Vec<String>> {
    let items = value.as_sequence().ok_or_else(|| {
        CompileError::schema(file, field, format!("expected a list, found {}", kind(value)))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(CompileError::schema(
                file,
                format!("{field}[{i}]"),
                format!("expected a string, found {}", kind(other)),
            )),
        })
        .collect()
}

/// Reject any explicitly tagged node; only plain data is accepted.
fn reject_tags(file: &Path, value: &Value, at: &str) -> CompileResult<()> {
    let field = |suffix: &str| {
        if at.is_empty() {
            suffix.to_string()
        } else {
            format!("{at}.{suffix}")
        }
    };

    match value {
        Value::Tagged(tagged) => Err(CompileError::schema(
            file,
            if at.is_empty() { "<root>" } else { at },
            format!("YAML tag {} is not allowed", tagged.tag),
        )),
        Value::Mapping(map) => {
            for (k, v) in map {
                if matches!(k, Value::Tagged(_)) {
                    return Err(CompileError::schema(
                        file,
                        field("<key>"),
                        "YAML tags are not allowed on keys",
                    ));
                }
                let name = k.as_str().map(str::to_string).unwrap_or_else(|| "<key>".to_string());
                reject_tags(file, v, &field(&name))?;
            }
            Ok(())
        }
        Value::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                let path = if at.is_empty() {
                    format!("[{i}]")
                } else {
                    format!("{at}[{i}]")
                };
                reject_tags(file, item, &path)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Reject every card whose id is shared with a card of different content.
///
/// Identical duplicates are kept; the resolver deduplicates them by id.
fn reject_conflicting_ids(corpus: &mut Corpus) -> Vec<CompileError> {
    let mut by_id: HashMap<&str, Vec<&LoadedCard>> = HashMap::new();
    for card in corpus.cards.values() {
        by_id.entry(card.id()).or_default().push(card);
    }

    let mut conflicting: Vec<(PathBuf, String)> = Vec::new();
    for (id, cards) in by_id {
        if cards.len() < 2 {
            continue;
        }
        let first = cards[0];
        if cards.iter().all(|c| c.card == first.card) {
            tracing::warn!(id, copies = cards.len(), "Identical Rule Card defined more than once");
            continue;
        }
        let files: Vec<String> = cards.iter().map(|c| c.path.display().to_string()).collect();
        for card in &cards {
            let others: Vec<&str> = files
                .iter()
                .map(String::as_str)
                .filter(|f| *f != card.path.display().to_string())
                .collect();
            conflicting.push((
                card.path.clone(),
                format!(
                    "duplicate id '{}' with different content in {}",
                    id,
                    others.join(", ")
                ),
            ));
        }
    }
    conflicting.sort();

    let mut errors = Vec::with_capacity(conflicting.len());
    for (path, reason) in conflicting {
        corpus.cards.remove(&path);
        corpus.rejected.insert(path.clone(), reason.clone());
        errors.push(CompileError::schema(&path, "id", reason));
    }
    errors
}

fn is_card_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;

    pub(crate) fn card_yaml(id: &str, detect: &str) -> String {
        format!(
            r#"id: {id}
title: Example requirement
severity: high
scope: backend services
requirement: Secrets must come from the secret manager.
do:
  - Load credentials at runtime
dont:
  - Commit credentials
detect:
{detect}
verify:
  tests:
    - No literal credentials in source
refs:
  cwe:
    - CWE-798
"#
        )
    }

    fn parse(raw: &str) -> CompileResult<RuleCard> {
        parse_card(Path::new("card.yml"), raw)
    }

    fn schema_field(err: CompileError) -> String {
        match err {
            CompileError::Schema { field, .. } => field,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_card() {
        let card = parse(&card_yaml("SECRETS-API-001", "  semgrep:\n    - ruleA")).unwrap();
        assert_eq!(card.id, "SECRETS-API-001");
        assert_eq!(card.severity, Severity::High);
        assert_eq!(card.detect["semgrep"], vec!["ruleA".to_string()]);
        assert_eq!(card.verify.tests.len(), 1);
        assert_eq!(card.refs["cwe"], vec!["CWE-798".to_string()]);
    }

    #[test]
    fn test_missing_verify_names_field() {
        let raw = card_yaml("SECRETS-API-001", "  semgrep:\n    - ruleA");
        let raw: String = raw
            .lines()
            .filter(|l| !l.starts_with("verify:") && !l.starts_with("  tests:") && !l.contains("No literal"))
            .collect::<Vec<_>>()
            .join("\n");
        let err = parse(&raw).unwrap_err();
        assert_eq!(err.code(), "SCHEMA_ERROR");
        assert_eq!(schema_field(err), "verify");
    }

    #[test]
    fn test_invalid_severity() {
        let raw = card_yaml("SECRETS-API-001", "  semgrep: [ruleA]").replace("severity: high", "severity: urgent");
        assert_eq!(schema_field(parse(&raw).unwrap_err()), "severity");
    }

    #[test]
    fn test_empty_detect_rejected() {
        let raw = card_yaml("SECRETS-API-001", "  {}").replace("detect:\n  {}", "detect: {}");
        assert_eq!(schema_field(parse(&raw).unwrap_err()), "detect");
    }

    #[test]
    fn test_detect_entries_must_be_lists_of_strings() {
        let raw = card_yaml("SECRETS-API-001", "  semgrep: ruleA");
        assert_eq!(schema_field(parse(&raw).unwrap_err()), "detect.semgrep");

        let raw = card_yaml("SECRETS-API-001", "  semgrep: [ruleA, 42]");
        assert_eq!(schema_field(parse(&raw).unwrap_err()), "detect.semgrep[1]");
    }

    #[test]
    fn test_bad_id_pattern() {
        let raw = card_yaml("secrets-api-1", "  semgrep: [ruleA]");
        assert_eq!(schema_field(parse(&raw).unwrap_err()), "id");
    }

    #[test]
    fn test_custom_tag_rejected() {
        let raw = card_yaml("SECRETS-API-001", "  semgrep: !python/object [ruleA]");
        let err = parse(&raw).unwrap_err();
        assert_eq!(schema_field(err), "detect.semgrep");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = parse("id: X\ntitle: [unclosed\n").unwrap_err();
        match err {
            CompileError::Parse { line, .. } => assert!(line.is_some()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_corpus_collects_errors_per_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), card_yaml("SECRETS-API-001", "  semgrep: [ruleA]")).unwrap();
        fs::write(dir.path().join("b.yml"), "id: [broken").unwrap();
        fs::write(dir.path().join("notes.md"), "not a card").unwrap();

        let load = load_corpus(dir.path()).unwrap();
        assert_eq!(load.corpus.len(), 1);
        assert_eq!(load.errors.len(), 1);
        assert_eq!(load.errors[0].code(), "PARSE_ERROR");
        assert_eq!(load.corpus.rejected_count(), 1);
    }

    #[test]
    fn test_conflicting_duplicate_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), card_yaml("SECRETS-API-001", "  semgrep: [ruleA]")).unwrap();
        fs::write(dir.path().join("b.yml"), card_yaml("SECRETS-API-001", "  semgrep: [ruleB]")).unwrap();

        let load = load_corpus(dir.path()).unwrap();
        assert!(load.corpus.is_empty());
        assert_eq!(load.errors.len(), 2);
        assert!(load.errors.iter().all(|e| e.code() == "SCHEMA_ERROR"));
        assert!(load.errors[0].to_string().contains("duplicate id"));
    }

    #[test]
    fn test_identical_duplicate_ids_kept() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = card_yaml("SECRETS-API-001", "  semgrep: [ruleA]");
        fs::write(dir.path().join("a.yml"), &yaml).unwrap();
        fs::write(dir.path().join("b.yaml"), &yaml).unwrap();

        let load = load_corpus(dir.path()).unwrap();
        assert!(load.is_clean());
        assert_eq!(load.corpus.len(), 2);
    }

    #[test]
    fn test_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.yml");
        fs::write(&file, card_yaml("SECRETS-API-001", "  semgrep: [ruleA]")).unwrap();

        let load = load_corpus(&file).unwrap();
        assert_eq!(load.corpus.len(), 1);
        assert_eq!(load.corpus.root(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_named_file_is_loaded_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("card.txt");
        fs::write(&file, "id: [totally broken").unwrap();

        let load = load_corpus(&file).unwrap();
        assert!(load.corpus.is_empty());
        assert_eq!(load.errors.len(), 1);
        assert_eq!(load.errors[0].code(), "PARSE_ERROR");
    }

    #[test]
    fn test_directory_walk_skips_non_card_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("card.txt"), "id: [totally broken").unwrap();

        let load = load_corpus(dir.path()).unwrap();
        assert!(load.is_clean());
    }
}
