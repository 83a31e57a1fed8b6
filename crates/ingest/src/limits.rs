//! Running counters checked against the configured limits.
//!
//! Every check runs synchronously when its event arrives and before any byte
//! of it is buffered. Counters are private to one ingestion call.
use crate::config::IngestConfig;
use crate::error::IngestError;

/// A limit the decoder reports as already exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitKind {
    Fields,
    FieldSize { field: String },
    Files,
    FileSize { field: String },
    TotalFileSize,
}

/// Byte counter for the file currently being buffered.
#[derive(Debug)]
pub struct FileTally {
    field: String,
    bytes: u64,
}

impl FileTally {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Tracks field/file counts and byte totals for one ingestion call.
#[derive(Debug)]
pub struct LimitEnforcer {
    max_fields: usize,
    max_field_size: usize,
    max_files: usize,
    max_file_size: u64,
    max_total_file_size: Option<u64>,
    fields: usize,
    files: usize,
    total_file_bytes: u64,
}

impl LimitEnforcer {
    pub fn new(cfg: &IngestConfig) -> Self {
        Self {
            max_fields: cfg.max_fields,
            max_field_size: cfg.max_field_size,
            max_files: cfg.max_files,
            max_file_size: cfg.max_file_size,
            max_total_file_size: cfg.max_total_file_size,
            fields: 0,
            files: 0,
            total_file_bytes: 0,
        }
    }

    /// Counts one text field and checks its length.
    ///
    /// `truncated` is set when the decoder already cut the value short at
    /// `max_field_size`; such a value is over the limit even if its retained
    /// length is not.
    pub fn admit_field(
        &mut self,
        name: &str,
        value_len: usize,
        truncated: bool,
    ) -> Result<(), IngestError> {
        if self.fields >= self.max_fields {
            return Err(self.classify(&LimitKind::Fields));
        }
        self.fields += 1;

        if truncated || value_len > self.max_field_size {
            return Err(self.classify(&LimitKind::FieldSize {
                field: name.to_owned(),
            }));
        }
        Ok(())
    }

    /// Counts one file part and opens its byte tally.
    pub fn admit_file(&mut self, name: &str) -> Result<FileTally, IngestError> {
        if self.files >= self.max_files {
            return Err(self.classify(&LimitKind::Files));
        }
        self.files += 1;
        Ok(FileTally {
            field: name.to_owned(),
            bytes: 0,
        })
    }

    /// Accounts one chunk of the file behind `tally`.
    ///
    /// The per-file limit is checked before the aggregate one; neither counter
    /// moves when a check fails.
    pub fn record_chunk(&mut self, tally: &mut FileTally, len: usize) -> Result<(), IngestError> {
        let len = len as u64;

        let file_bytes = tally.bytes.saturating_add(len);
        if file_bytes > self.max_file_size {
            return Err(self.classify(&LimitKind::FileSize {
                field: tally.field.clone(),
            }));
        }

        let total = self.total_file_bytes.saturating_add(len);
        if self.max_total_file_size.is_some_and(|max| total > max) {
            return Err(self.classify(&LimitKind::TotalFileSize));
        }

        tally.bytes = file_bytes;
        self.total_file_bytes = total;
        Ok(())
    }

    /// Maps a limit kind onto the typed failure carrying the configured bound.
    pub fn classify(&self, kind: &LimitKind) -> IngestError {
        match kind {
            LimitKind::Fields => IngestError::TooManyFields {
                max: self.max_fields,
            },
            LimitKind::FieldSize { field } => IngestError::FieldTooLarge {
                field: field.clone(),
                max: self.max_field_size,
            },
            LimitKind::Files => IngestError::TooManyFiles {
                max: self.max_files,
            },
            LimitKind::FileSize { field } => IngestError::FileTooLarge {
                field: field.clone(),
                max: self.max_file_size,
            },
            LimitKind::TotalFileSize => IngestError::TotalSizeExceeded {
                max: self.max_total_file_size.unwrap_or(u64::MAX),
            },
        }
    }

    pub fn fields(&self) -> usize {
        self.fields
    }

    pub fn files(&self) -> usize {
        self.files
    }

    pub fn total_file_bytes(&self) -> u64 {
        self.total_file_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enforcer(cfg: IngestConfig) -> LimitEnforcer {
        LimitEnforcer::new(&cfg)
    }

    #[test]
    fn field_count_limit() {
        let mut limits = enforcer(IngestConfig {
            max_fields: 2,
            ..Default::default()
        });
        assert!(limits.admit_field("a", 1, false).is_ok());
        assert!(limits.admit_field("b", 1, false).is_ok());
        assert_eq!(
            limits.admit_field("c", 1, false),
            Err(IngestError::TooManyFields { max: 2 })
        );
    }

    #[test]
    fn field_size_limit_and_truncation() {
        let mut limits = enforcer(IngestConfig {
            max_field_size: 4,
            ..Default::default()
        });
        assert!(limits.admit_field("ok", 4, false).is_ok());
        assert_eq!(
            limits.admit_field("long", 5, false),
            Err(IngestError::FieldTooLarge {
                field: "long".into(),
                max: 4
            })
        );
        assert!(matches!(
            limits.admit_field("cut", 4, true),
            Err(IngestError::FieldTooLarge { .. })
        ));
    }

    #[test]
    fn file_count_limit_ignores_size() {
        let mut limits = enforcer(IngestConfig {
            max_files: 1,
            ..Default::default()
        });
        assert!(limits.admit_file("a").is_ok());
        assert_eq!(
            limits.admit_file("b").map(|t| t.bytes()),
            Err(IngestError::TooManyFiles { max: 1 })
        );
        assert_eq!(limits.files(), 1);
    }

    #[test]
    fn exact_file_size_is_accepted() {
        let mut limits = enforcer(IngestConfig {
            max_file_size: 1024,
            ..Default::default()
        });
        let mut tally = limits.admit_file("doc").expect("first file admitted");
        assert!(limits.record_chunk(&mut tally, 1000).is_ok());
        assert!(limits.record_chunk(&mut tally, 24).is_ok());
        assert_eq!(tally.bytes(), 1024);
        assert_eq!(
            limits.record_chunk(&mut tally, 1),
            Err(IngestError::FileTooLarge {
                field: "doc".into(),
                max: 1024
            })
        );
        assert_eq!(tally.bytes(), 1024);
    }

    #[test]
    fn aggregate_limit_spans_files() {
        let mut limits = enforcer(IngestConfig {
            max_file_size: 10,
            max_total_file_size: Some(15),
            ..Default::default()
        });
        let mut first = limits.admit_file("a").expect("admit a");
        limits.record_chunk(&mut first, 10).expect("a fits");
        let mut second = limits.admit_file("b").expect("admit b");
        limits.record_chunk(&mut second, 5).expect("b fits");
        assert_eq!(
            limits.record_chunk(&mut second, 1),
            Err(IngestError::TotalSizeExceeded { max: 15 })
        );
        assert_eq!(limits.total_file_bytes(), 15);
    }

    #[test]
    fn per_file_limit_wins_over_aggregate_on_same_chunk() {
        let mut limits = enforcer(IngestConfig {
            max_file_size: 4,
            max_total_file_size: Some(4),
            ..Default::default()
        });
        let mut tally = limits.admit_file("a").expect("admit");
        assert!(matches!(
            limits.record_chunk(&mut tally, 5),
            Err(IngestError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn unbounded_aggregate_by_default() {
        let mut limits = enforcer(IngestConfig {
            max_file_size: u64::MAX,
            ..Default::default()
        });
        let mut tally = limits.admit_file("a").expect("admit");
        assert!(limits.record_chunk(&mut tally, usize::MAX / 2).is_ok());
    }
}
