//! Error types for the chip-codec system.
//!
//! All operations return structured errors rather than panicking.
//! Validation failures, malformed dictionaries and exhausted bit streams all
//! surface as dedicated variants so callers can react to the exact failure.

use thiserror::Error;

use crate::huffman::Letter;
use crate::pixel::Ordering;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Package: bit-level reading/writing of packed data
/// - Layout: region geometry and coordinate conversions
/// - Chip: pixel bookkeeping on a chip
/// - Huffman: code construction or encode/decode failures
/// - Statistics: alphabet statistics validation and dictionary files
/// - I/O: file system operations
#[derive(Debug, Error)]
pub enum Error {
    /// Bit-level package operation failed (e.g., reading past the end)
    #[error("package error: {0}")]
    Package(#[from] PackageError),

    /// Region layout is invalid or a coordinate conversion failed
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Chip content manipulation failed (e.g., duplicate pixel)
    #[error("chip error: {0}")]
    Chip(#[from] ChipError),

    /// Huffman code construction or lookup failed
    #[error("huffman error: {0}")]
    Huffman(#[from] HuffmanError),

    /// Alphabet statistics validation or dictionary parsing failed
    #[error("statistics error: {0}")]
    Statistics(#[from] StatisticsError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bit-level package errors.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Requested more bits than fit into the 64-bit transfer word
    #[error("number of bits {requested} exceeds the 64-bit word size")]
    TooManyBits { requested: usize },

    /// Value does not fit into the requested number of bits
    #[error("value {value} is too big: max value for {n_bits} bits is {max_value}")]
    ValueOutOfRange {
        value: u64,
        n_bits: usize,
        max_value: u64,
    },

    /// Attempted to read past the end of the package
    #[error("unexpected end of package: requested {requested} bits, {available} left")]
    UnexpectedEof { requested: usize, available: usize },

    /// Reader arithmetic would produce a negative position or distance
    #[error("negative bit delta: cannot move {delta} bits back from position {position}")]
    NegativeDelta { delta: usize, position: usize },

    /// Distance requested between readers of two different packages
    #[error("readers reference two different packages")]
    ReaderMismatch,
}

/// Region layout errors.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Zero rows or columns
    #[error("invalid region dimensions {n_rows}x{n_columns}")]
    InvalidLayout { n_rows: usize, n_columns: usize },

    /// Pixel coordinates outside the declared layout
    #[error("pixel ({row}, {column}) is outside of the {n_rows}x{n_columns} region")]
    PixelOutOfRange {
        row: i16,
        column: i16,
        n_rows: usize,
        n_columns: usize,
    },

    /// Region index outside the declared region grid
    #[error("region id {region_id} is outside of the {n_regions}-region grid")]
    RegionOutOfRange { region_id: usize, n_regions: usize },
}

/// Chip content errors.
#[derive(Debug, Error)]
pub enum ChipError {
    /// Insertion of an already-present pixel
    #[error("pixel ({row}, {column}) is already present")]
    DuplicatePixel { row: i16, column: i16 },

    /// Lookup of a region that holds no pixels
    #[error("region {region_id} is not active")]
    InactiveRegion { region_id: usize },

    /// Ordering not supported in this context
    #[error("unsupported ordering {ordering}")]
    UnsupportedOrdering { ordering: Ordering },
}

/// Huffman codec errors.
#[derive(Debug, Error)]
pub enum HuffmanError {
    /// Code length exceeds the 64-bit code container
    #[error("huffman code is too long: {n_bits} bits exceed the 64-bit container")]
    CodeTooLong { n_bits: usize },

    /// Malformed code string (characters other than '0'/'1')
    #[error("invalid huffman code string '{text}'")]
    InvalidCodeString { text: String },

    /// No letters to build a table from
    #[error("empty frequency table: cannot build a huffman table")]
    EmptyFrequencyTable,

    /// Letter or code already present in the table
    #[error("letter {letter} maps to a code already present in the table")]
    DuplicateEntry { letter: Letter },

    /// Letter not present in the alphabet
    #[error("letter {letter} is not present in alphabet '{alphabet}'")]
    UnknownLetter { letter: Letter, alphabet: String },
}

/// Alphabet statistics and dictionary-file errors.
#[derive(Debug, Error)]
pub enum StatisticsError {
    /// Entropy must be zero or positive
    #[error("entropy {entropy} is negative")]
    NegativeEntropy { entropy: f64 },

    /// Total observation count must be positive
    #[error("original counts must be a positive number")]
    NonPositiveCounts,

    /// Alphabet must contain at least one letter
    #[error("alphabet is empty")]
    EmptyAlphabet,

    /// A letter of the alphabet has no probability assigned
    #[error("missing original probability for letter {letter}")]
    MissingProbability { letter: Letter },

    /// A letter of the alphabet has no Huffman code assigned
    #[error("missing huffman code for letter {letter}")]
    MissingCode { letter: Letter },

    /// A probability is outside [0, 1]
    #[error("invalid original probability {probability} for letter {letter}")]
    ProbabilityOutOfRange { letter: Letter, probability: f64 },

    /// Probabilities do not sum to 1 within tolerance
    #[error("total original probability {total} is not consistent with 1")]
    InconsistentProbabilitySum { total: f64 },

    /// The same letter appears twice in a serialized alphabet block
    #[error("letter {letter} is already defined")]
    DuplicateLetter { letter: Letter },

    /// Statistics requested from a producer that saw no observations
    #[error("statistics are not available for '{name}': no counts collected")]
    EmptyProducer { name: String },

    /// Reduction target smaller than two letters
    #[error("new alphabet size {new_size} is too small")]
    AlphabetTooSmall { new_size: usize },

    /// Reduction special letter collides with an existing letter
    #[error("special letter {letter} is already present in the alphabet")]
    SpecialLetterPresent { letter: Letter },

    /// Two alphabet blocks with the same name in one dictionary file
    #[error("alphabet statistics '{name}' is already defined")]
    DuplicateAlphabet { name: String },

    /// Lookup of an alphabet the dictionary does not define
    #[error("alphabet statistics '{name}' not found")]
    UnknownAlphabet { name: String },

    /// A dictionary file is required for this encoder format
    #[error("a dictionary file is required for this encoder format")]
    DictionaryRequired,

    /// Unparseable field in a dictionary file
    #[error("malformed dictionary line {line}: {text}")]
    MalformedDictionary { line: usize, text: String },

    /// File ended in the middle of an alphabet block
    #[error("unexpected end of dictionary file inside an alphabet block")]
    UnexpectedEndOfDictionary,
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
