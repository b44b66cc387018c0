//! Dump options DTO

/// Default path of the change journal file on an NTFS volume
pub const DEFAULT_JOURNAL_ENTRY_PATH: &str = "/$Extend/$UsnJrnl";

/// Default name of the journal's record stream
pub const DEFAULT_JOURNAL_STREAM_NAME: &str = "$J";

/// Options for dumping change journal records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
    /// Entry holding the journal on a volume
    pub journal_entry_path: String,
    /// Name of the `$DATA` stream holding the records
    pub journal_stream_name: String,
    /// Bytes the decoder pulls from a stream per read
    pub read_chunk_size: usize,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            journal_entry_path: DEFAULT_JOURNAL_ENTRY_PATH.to_string(),
            journal_stream_name: DEFAULT_JOURNAL_STREAM_NAME.to_string(),
            read_chunk_size: 64 * 1024, // 64KB reads
        }
    }
}

impl DumpOptions {
    /// Creates options with the standard journal location
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the journal entry path
    pub fn with_journal_entry_path(mut self, path: &str) -> Self {
        self.journal_entry_path = path.to_string();
        self
    }

    /// Sets the journal stream name
    pub fn with_journal_stream_name(mut self, name: &str) -> Self {
        self.journal_stream_name = name.to_string();
        self
    }

    /// Sets the read chunk size
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }
}
