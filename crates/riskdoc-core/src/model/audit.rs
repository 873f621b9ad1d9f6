use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of change recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Creation,
    Update,
    Validation,
    FullReevaluation,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Creation => "creation",
            ChangeKind::Update => "update",
            ChangeKind::Validation => "validation",
            ChangeKind::FullReevaluation => "full re-evaluation",
        }
    }
}

/// Counters frozen at the time an audit entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditSnapshot {
    pub total_hazards: usize,
    pub critical_hazards: usize,
    pub mitigations: usize,
}

/// One immutable line of the document history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub version: String,
    pub change: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
    pub snapshot: AuditSnapshot,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit entry at {attempted} predates the latest entry at {latest}")]
    OutOfOrder {
        latest: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },
}

/// Chronological, append-only history of a document.
///
/// Entries can be appended and read; nothing can be edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; its timestamp must not precede the latest one.
    pub fn append(&mut self, entry: AuditEntry) -> Result<(), AuditError> {
        if let Some(latest) = self.entries.last() {
            if entry.at < latest.at {
                return Err(AuditError::OutOfOrder {
                    latest: latest.at,
                    attempted: entry.at,
                });
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a AuditLog {
    type Item = &'a AuditEntry;
    type IntoIter = std::slice::Iter<'a, AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(hour: u32, change: ChangeKind) -> AuditEntry {
        AuditEntry {
            at: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            version: "1.0".into(),
            change,
            description: None,
            evaluator: Some("J. Martin".into()),
            snapshot: AuditSnapshot::default(),
        }
    }

    #[test]
    fn appends_in_chronological_order() {
        let mut log = AuditLog::new();
        log.append(entry(8, ChangeKind::Creation)).unwrap();
        log.append(entry(9, ChangeKind::Update)).unwrap();
        log.append(entry(9, ChangeKind::Validation)).unwrap();
        let kinds: Vec<_> = log.iter().map(|e| e.change).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Creation,
                ChangeKind::Update,
                ChangeKind::Validation
            ]
        );
        assert_eq!(log.latest().map(|e| e.change), Some(ChangeKind::Validation));
    }

    #[test]
    fn rejects_entries_older_than_latest() {
        let mut log = AuditLog::new();
        log.append(entry(10, ChangeKind::Creation)).unwrap();
        let err = log
            .append(entry(9, ChangeKind::Update))
            .expect_err("older entry should be rejected");
        assert!(matches!(err, AuditError::OutOfOrder { .. }));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut log = AuditLog::new();
        log.append(entry(8, ChangeKind::FullReevaluation)).unwrap();
        let value = serde_json::to_value(&log).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["change"], "full_reevaluation");
    }
}
