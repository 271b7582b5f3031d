/// Language used by accessors and display strings when none is given
pub const DEFAULT_LANGUAGE: &str = "en";

/// Read buffer for decompressed dump streams
pub const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Write buffer for chunk and filtered output files
pub const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Entities per chunk when the caller does not choose
pub const DEFAULT_LINES_PER_CHUNK: usize = 100;

/// Zero-pad width of the chunk index in chunk file names
pub const CHUNK_INDEX_WIDTH: usize = 5;

/// Progress update interval (tick every N entities)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Finest time precision (seconds); 0 is a gigayear
pub const MAX_TIME_PRECISION: u8 = 14;

/// Globe assumed when a coordinate does not name one (Earth)
pub const DEFAULT_GLOBE: &str = "http://www.wikidata.org/entity/Q2";
