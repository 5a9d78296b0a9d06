//! Alphabet statistics: validated per-alphabet Huffman tables, the mutable
//! frequency accumulator that produces them, and the dictionary-file
//! collection the encoders load at construction time.
//!
//! # Dictionary text format
//!
//! One block per alphabet, blocks concatenated in a single UTF-8 file
//! (optional BOM, CR-LF tolerated):
//!
//! ```text
//! <name>
//! number_of_letters             <N>
//! alphabet_entropy              <H>
//! original_number_of_counts     <C>
//! Letter              Orig_probability    Huffman_nbits       Huffman_code
//! <L1>                <p1>                <b1>                <bits1>
//! ...
//! ```
//!
//! `<bits>` is a '0'/'1' string listing the code bits from the LSB to the
//! MSB, exactly the order in which the encoder emits them. The file ends at
//! a clean end-of-stream between blocks; running out of data inside a block
//! is an error.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{HuffmanError, Result, StatisticsError};
use crate::huffman::{self, HuffmanCode, HuffmanTable, Letter};

/// Tolerance on the probability sum check.
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-5;

/// Column width of the per-letter table.
const COLUMN_WIDTH: usize = 20;

/// Column width of the block header fields.
const HEADER_WIDTH: usize = 30;

/// The alphabets consumed by the package makers, keyed to their canonical
/// names in the dictionary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphabetType {
    Adc,
    ActiveAdc,
    DeltaRow,
    DeltaColumn,
    DeltaRowColumn,
}

impl AlphabetType {
    /// Canonical block name in the dictionary file.
    pub fn name(&self) -> &'static str {
        match self {
            AlphabetType::Adc => "all_adc",
            AlphabetType::ActiveAdc => "active_adc",
            AlphabetType::DeltaRow => "delta_row",
            AlphabetType::DeltaColumn => "delta_column",
            AlphabetType::DeltaRowColumn => "delta_row_column",
        }
    }
}

/// Immutable statistics of one alphabet: observation counts, probabilities,
/// entropy and the Huffman table built from the frequencies.
#[derive(Debug, Clone)]
pub struct AlphabetStatistics {
    name: String,
    alphabet: BTreeSet<Letter>,
    original_counts: u64,
    original_probabilities: BTreeMap<Letter, f64>,
    entropy: f64,
    huffman_table: HuffmanTable,
}

impl AlphabetStatistics {
    /// Bundle and validate alphabet statistics.
    ///
    /// # Errors
    /// `StatisticsError` when the entropy is negative, the counts are zero,
    /// the alphabet is empty, a letter misses its probability or code, a
    /// probability falls outside [0, 1], or the probabilities do not sum to
    /// 1 within `1e-5`.
    pub fn new(
        name: String,
        alphabet: BTreeSet<Letter>,
        original_counts: u64,
        original_probabilities: BTreeMap<Letter, f64>,
        entropy: f64,
        huffman_table: HuffmanTable,
    ) -> Result<Self> {
        if entropy < 0.0 {
            return Err(StatisticsError::NegativeEntropy { entropy }.into());
        }
        if original_counts == 0 {
            return Err(StatisticsError::NonPositiveCounts.into());
        }
        if alphabet.is_empty() {
            return Err(StatisticsError::EmptyAlphabet.into());
        }
        let mut total_probability = 0.0;
        for &letter in &alphabet {
            let probability = *original_probabilities
                .get(&letter)
                .ok_or(StatisticsError::MissingProbability { letter })?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(StatisticsError::ProbabilityOutOfRange {
                    letter,
                    probability,
                }
                .into());
            }
            if huffman_table.code(letter).is_none() {
                return Err(StatisticsError::MissingCode { letter }.into());
            }
            total_probability += probability;
        }
        if (total_probability - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(StatisticsError::InconsistentProbabilitySum {
                total: total_probability,
            }
            .into());
        }
        Ok(Self {
            name,
            alphabet,
            original_counts,
            original_probabilities,
            entropy,
            huffman_table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alphabet(&self) -> &BTreeSet<Letter> {
        &self.alphabet
    }

    /// Whether the letter belongs to the alphabet.
    pub fn contains(&self, letter: Letter) -> bool {
        self.alphabet.contains(&letter)
    }

    pub fn entropy(&self) -> f64 {
        self.entropy
    }

    pub fn original_counts(&self) -> u64 {
        self.original_counts
    }

    /// Observed probability of the letter.
    pub fn original_probability(&self, letter: Letter) -> Result<f64> {
        self.check_letter(letter)?;
        Ok(self.original_probabilities[&letter])
    }

    /// Observed frequency of the letter (probability scaled by the counts).
    pub fn original_frequency(&self, letter: Letter) -> Result<f64> {
        Ok(self.original_probability(letter)? * self.original_counts as f64)
    }

    /// The Huffman code of the letter.
    pub fn huffman_code(&self, letter: Letter) -> Result<&HuffmanCode> {
        self.check_letter(letter)?;
        self.huffman_table
            .code(letter)
            .ok_or_else(|| StatisticsError::MissingCode { letter }.into())
    }

    /// Reverse lookup: the letter a complete code maps to, if any.
    pub fn letter_from_code(&self, code: &HuffmanCode) -> Option<Letter> {
        self.huffman_table.letter(code)
    }

    fn check_letter(&self, letter: Letter) -> Result<()> {
        if !self.contains(letter) {
            return Err(HuffmanError::UnknownLetter {
                letter,
                alphabet: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Write this alphabet as one dictionary text block.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", self.name)?;
        writeln!(out, "{:<HEADER_WIDTH$}{}", "number_of_letters", self.alphabet.len())?;
        writeln!(out, "{:<HEADER_WIDTH$}{:.5e}", "alphabet_entropy", self.entropy)?;
        writeln!(
            out,
            "{:<HEADER_WIDTH$}{}",
            "original_number_of_counts", self.original_counts
        )?;
        writeln!(
            out,
            "{:<COLUMN_WIDTH$}{:<COLUMN_WIDTH$}{:<COLUMN_WIDTH$}{:<COLUMN_WIDTH$}",
            "Letter", "Orig_probability", "Huffman_nbits", "Huffman_code"
        )?;
        for &letter in &self.alphabet {
            let probability = self.original_probability(letter)?;
            let code = self.huffman_code(letter)?;
            writeln!(
                out,
                "{:<COLUMN_WIDTH$}{:<COLUMN_WIDTH$}{:<COLUMN_WIDTH$}{:<COLUMN_WIDTH$}",
                letter,
                format!("{probability:.5e}"),
                code.len(),
                code.to_string()
            )?;
        }
        Ok(())
    }
}

/// Line cursor over a dictionary file, tracking line numbers for messages.
struct DictionaryCursor<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl<'a> DictionaryCursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line_number: 0,
        }
    }

    /// Next line with BOM and trailing CR stripped; `None` at end of file.
    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line_number += 1;
        Some(line.trim_start_matches('\u{feff}').trim_end_matches('\r'))
    }

    /// Next line that contains non-whitespace content.
    fn next_content_line(&mut self) -> Option<&'a str> {
        loop {
            let line = self.next_line()?;
            if !line.trim().is_empty() {
                return Some(line);
            }
        }
    }

    fn malformed(&self, text: impl Into<String>) -> crate::error::Error {
        StatisticsError::MalformedDictionary {
            line: self.line_number,
            text: text.into(),
        }
        .into()
    }

    /// Parse a `key value` header line, returning the value.
    fn read_param<T: std::str::FromStr>(&mut self) -> Result<T> {
        let line = self
            .next_content_line()
            .ok_or(StatisticsError::UnexpectedEndOfDictionary)?;
        let mut tokens = line.split_whitespace();
        let _key = tokens
            .next()
            .ok_or_else(|| self.malformed(line.to_string()))?;
        let value = tokens
            .next()
            .ok_or_else(|| self.malformed(line.to_string()))?;
        value
            .parse::<T>()
            .map_err(|_| self.malformed(value.to_string()))
    }

    /// Parse one alphabet block; `None` on a clean end of stream before the
    /// block name.
    fn read_block(&mut self) -> Result<Option<AlphabetStatistics>> {
        let name = match self.next_content_line() {
            Some(line) => line.trim().to_string(),
            None => return Ok(None),
        };
        let n_letters: usize = self.read_param()?;
        let entropy: f64 = self.read_param()?;
        let n_counts: u64 = self.read_param()?;
        // Column header row.
        self.next_content_line()
            .ok_or(StatisticsError::UnexpectedEndOfDictionary)?;

        let mut alphabet = BTreeSet::new();
        let mut probabilities = BTreeMap::new();
        let mut table = HuffmanTable::new();
        for _ in 0..n_letters {
            let line = self
                .next_content_line()
                .ok_or(StatisticsError::UnexpectedEndOfDictionary)?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 4 {
                return Err(self.malformed(line.to_string()));
            }
            let letter: Letter = tokens[0]
                .parse()
                .map_err(|_| self.malformed(tokens[0].to_string()))?;
            let probability: f64 = tokens[1]
                .parse()
                .map_err(|_| self.malformed(tokens[1].to_string()))?;
            let _n_bits: usize = tokens[2]
                .parse()
                .map_err(|_| self.malformed(tokens[2].to_string()))?;
            let code: HuffmanCode = tokens[3].parse()?;
            if !alphabet.insert(letter) {
                return Err(StatisticsError::DuplicateLetter { letter }.into());
            }
            probabilities.insert(letter, probability);
            table.insert(letter, code)?;
        }

        AlphabetStatistics::new(name, alphabet, n_counts, probabilities, entropy, table)
            .map(Some)
    }
}

/// Read-only set of alphabet statistics loaded from one dictionary file.
#[derive(Debug, Default)]
pub struct AlphabetStatisticsCollection {
    statistics: HashMap<String, Arc<AlphabetStatistics>>,
}

impl AlphabetStatisticsCollection {
    /// Load every alphabet block of the dictionary file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a dictionary from its text content.
    pub fn parse(text: &str) -> Result<Self> {
        let mut cursor = DictionaryCursor::new(text);
        let mut statistics = HashMap::new();
        while let Some(block) = cursor.read_block()? {
            let name = block.name().to_string();
            if statistics.contains_key(&name) {
                return Err(StatisticsError::DuplicateAlphabet { name }.into());
            }
            statistics.insert(name, Arc::new(block));
        }
        Ok(Self { statistics })
    }

    /// Whether an alphabet with the given name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.statistics.contains_key(name)
    }

    /// Statistics of the named alphabet.
    pub fn get(&self, name: &str) -> Result<Arc<AlphabetStatistics>> {
        self.statistics
            .get(name)
            .cloned()
            .ok_or_else(|| {
                StatisticsError::UnknownAlphabet {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Statistics of a canonical alphabet.
    pub fn get_by_type(&self, alphabet_type: AlphabetType) -> Result<Arc<AlphabetStatistics>> {
        self.get(alphabet_type.name())
    }
}

/// Mutable per-alphabet frequency accumulator.
///
/// Internally locked: concurrent `add_count` calls from several threads are
/// serialized, and a `produce` that follows them observes all of them. The
/// total count saturates at `u64::MAX`; once saturated, further counts are
/// dropped and `produce` reports the saturation once on stderr.
#[derive(Debug)]
pub struct AlphabetStatisticsProducer {
    name: String,
    state: Mutex<ProducerState>,
}

#[derive(Debug, Clone, Default)]
struct ProducerState {
    n_counts: u64,
    letter_frequencies: BTreeMap<Letter, u64>,
    saturation_reported: bool,
}

impl AlphabetStatisticsProducer {
    /// Create a producer with an empty alphabet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ProducerState::default()),
        }
    }

    /// Create a producer with every letter of the alphabet pre-seeded at
    /// frequency zero, so the produced table covers unobserved letters too.
    pub fn with_alphabet(
        name: impl Into<String>,
        alphabet: impl IntoIterator<Item = Letter>,
    ) -> Self {
        let producer = Self::new(name);
        {
            let mut state = producer.lock_state();
            for letter in alphabet {
                state.letter_frequencies.insert(letter, 0);
            }
        }
        producer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of letters currently known to the alphabet.
    pub fn n_letters(&self) -> usize {
        self.lock_state().letter_frequencies.len()
    }

    /// Total number of recorded observations.
    pub fn n_counts(&self) -> u64 {
        self.lock_state().n_counts
    }

    /// Whether the total count has reached the integer limit.
    pub fn is_saturated(&self) -> bool {
        self.lock_state().n_counts == u64::MAX
    }

    /// Snapshot of the accumulated letter frequencies.
    pub fn frequencies(&self) -> BTreeMap<Letter, u64> {
        self.lock_state().letter_frequencies.clone()
    }

    /// Record one observation of `letter`.
    ///
    /// Counts past `u64::MAX` are dropped.
    pub fn add_count(&self, letter: Letter) {
        let mut state = self.lock_state();
        if state.n_counts == u64::MAX {
            return;
        }
        *state.letter_frequencies.entry(letter).or_insert(0) += 1;
        state.n_counts += 1;
    }

    /// Compute probabilities and entropy and build the Huffman table.
    ///
    /// Prints a one-line `entropy = ...` progress message.
    ///
    /// # Errors
    /// `StatisticsError::EmptyProducer` when no counts were recorded.
    pub fn produce(&self) -> Result<AlphabetStatistics> {
        let mut state = self.lock_state();
        self.check_counts(&mut state)?;

        let n_counts = state.n_counts;
        let mut probabilities = BTreeMap::new();
        let mut entropy = 0.0;
        for (&letter, &frequency) in &state.letter_frequencies {
            let probability = frequency as f64 / n_counts as f64;
            probabilities.insert(letter, probability);
            if probability > 0.0 {
                entropy -= probability * probability.log2();
            }
        }
        println!(
            "Producing alphabet statistics for '{}'... entropy = {entropy}.",
            self.name
        );

        let table = huffman::build_table(&state.letter_frequencies)?;
        let alphabet: BTreeSet<Letter> = state.letter_frequencies.keys().copied().collect();
        AlphabetStatistics::new(
            self.name.clone(),
            alphabet,
            n_counts,
            probabilities,
            entropy,
            table,
        )
    }

    /// Shrink the alphabet to at most `new_size` letters.
    ///
    /// The `new_size - 1` highest-frequency letters are kept and the
    /// remaining frequency mass is folded into `special_letter`. An
    /// alphabet that already fits is returned as an unchanged copy.
    ///
    /// # Errors
    /// - `StatisticsError::AlphabetTooSmall` for `new_size <= 1`
    /// - `StatisticsError::SpecialLetterPresent` if `special_letter` is
    ///   already part of the alphabet
    /// - `StatisticsError::EmptyProducer` when no counts were recorded
    pub fn reduce(
        &self,
        new_size: usize,
        new_name: impl Into<String>,
        special_letter: Letter,
    ) -> Result<AlphabetStatisticsProducer> {
        let mut state = self.lock_state();
        if new_size <= 1 {
            return Err(StatisticsError::AlphabetTooSmall { new_size }.into());
        }
        if state.letter_frequencies.contains_key(&special_letter) {
            return Err(StatisticsError::SpecialLetterPresent {
                letter: special_letter,
            }
            .into());
        }
        self.check_counts(&mut state)?;
        let ordered = frequency_ordered(&state.letter_frequencies);
        if ordered.len() <= new_size {
            return Ok(Self {
                name: self.name.clone(),
                state: Mutex::new(ProducerState::clone(&state)),
            });
        }

        let mut reduced = ProducerState {
            n_counts: state.n_counts,
            ..ProducerState::default()
        };
        let mut kept_count = 0u64;
        for n in 0..new_size - 1 {
            let (letter, frequency) = ordered[ordered.len() - n - 1];
            reduced.letter_frequencies.insert(letter, frequency);
            kept_count += frequency;
        }
        reduced
            .letter_frequencies
            .insert(special_letter, state.n_counts - kept_count);
        Ok(Self {
            name: new_name.into(),
            state: Mutex::new(reduced),
        })
    }

    /// Fail on an empty accumulator and report saturation once.
    fn check_counts(&self, state: &mut ProducerState) -> Result<()> {
        if state.n_counts == 0 {
            return Err(StatisticsError::EmptyProducer {
                name: self.name.clone(),
            }
            .into());
        }
        if state.n_counts == u64::MAX && !state.saturation_reported {
            eprintln!(
                "WARNING: integer limit was reached while collecting statistics for '{}'.",
                self.name
            );
            state.saturation_reported = true;
        }
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, ProducerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Clone for AlphabetStatisticsProducer {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Mutex::new(self.lock_state().clone()),
        }
    }
}

/// Letters sorted by frequency ascending; ties order higher letters first.
/// Selection of the top letters pops from the end of this vector.
fn frequency_ordered(letter_frequencies: &BTreeMap<Letter, u64>) -> Vec<(Letter, u64)> {
    let mut ordered: Vec<(Letter, u64)> =
        letter_frequencies.iter().map(|(&l, &f)| (l, f)).collect();
    ordered.sort_by(|first, second| {
        first
            .1
            .cmp(&second.1)
            .then_with(|| second.0.cmp(&first.0))
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counted_producer(counts: &[(Letter, u64)]) -> AlphabetStatisticsProducer {
        let producer =
            AlphabetStatisticsProducer::with_alphabet("test", counts.iter().map(|(l, _)| *l));
        for &(letter, frequency) in counts {
            for _ in 0..frequency {
                producer.add_count(letter);
            }
        }
        producer
    }

    #[test]
    fn test_produce_uniform_entropy() {
        let counts: Vec<(Letter, u64)> = (0..8).map(|n| (n, 5)).collect();
        let statistics = counted_producer(&counts).produce().unwrap();

        assert!((statistics.entropy() - 3.0).abs() < 1e-9);
        assert_eq!(statistics.original_counts(), 40);
        for letter in 0..8 {
            assert!((statistics.original_probability(letter).unwrap() - 0.125).abs() < 1e-12);
        }
    }

    #[test]
    fn test_produce_covers_zero_frequency_letters() {
        let producer = AlphabetStatisticsProducer::with_alphabet("test", 0..4);
        producer.add_count(1);
        let statistics = producer.produce().unwrap();

        assert_eq!(statistics.alphabet().len(), 4);
        assert_eq!(statistics.original_probability(3).unwrap(), 0.0);
        assert!(statistics.huffman_code(3).is_ok());
    }

    #[test]
    fn test_produce_empty_fails() {
        let producer = AlphabetStatisticsProducer::new("empty");
        assert!(matches!(
            producer.produce(),
            Err(crate::error::Error::Statistics(StatisticsError::EmptyProducer { .. }))
        ));
    }

    #[test]
    fn test_unknown_letter() {
        let statistics = counted_producer(&[(0, 1), (1, 1)]).produce().unwrap();
        assert!(matches!(
            statistics.huffman_code(5),
            Err(crate::error::Error::Huffman(HuffmanError::UnknownLetter { .. }))
        ));
    }

    #[test]
    fn test_reduce_conserves_counts() {
        let producer = counted_producer(&[(0, 50), (1, 30), (2, 10), (3, 7), (4, 3)]);
        let reduced = producer.reduce(3, "reduced", -1).unwrap();

        let frequencies = reduced.frequencies();
        assert_eq!(frequencies.len(), 3);
        assert_eq!(frequencies[&0], 50);
        assert_eq!(frequencies[&1], 30);
        // The dropped letters' mass lands on the special letter.
        assert_eq!(frequencies[&-1], 20);
        assert_eq!(frequencies.values().sum::<u64>(), producer.n_counts());
        assert_eq!(reduced.name(), "reduced");
    }

    #[test]
    fn test_reduce_small_alphabet_is_copy() {
        let producer = counted_producer(&[(0, 5), (1, 5)]);
        let reduced = producer.reduce(4, "unused", -1).unwrap();
        assert_eq!(reduced.name(), "test");
        assert_eq!(reduced.frequencies(), producer.frequencies());
    }

    #[test]
    fn test_reduce_rejects_bad_arguments() {
        let producer = counted_producer(&[(0, 5), (1, 5)]);
        assert!(producer.reduce(1, "x", -1).is_err());
        assert!(producer.reduce(2, "x", 0).is_err());
    }

    #[test]
    fn test_frequency_ordering_tie_break() {
        let frequencies: BTreeMap<Letter, u64> =
            [(1, 10), (2, 10), (3, 5)].into_iter().collect();
        let ordered = frequency_ordered(&frequencies);
        // Ascending frequency; within the tie the higher letter sorts first.
        assert_eq!(ordered, vec![(3, 5), (2, 10), (1, 10)]);
    }

    #[test]
    fn test_statistics_validation() {
        let statistics = counted_producer(&[(0, 1), (1, 3)]).produce().unwrap();

        // Corrupted probability sum is rejected.
        let mut probabilities = BTreeMap::new();
        probabilities.insert(0, 0.9);
        probabilities.insert(1, 0.9);
        let mut table = HuffmanTable::new();
        table.insert(0, "0".parse().unwrap()).unwrap();
        table.insert(1, "1".parse().unwrap()).unwrap();
        let result = AlphabetStatistics::new(
            "bad".to_string(),
            statistics.alphabet().clone(),
            4,
            probabilities,
            1.0,
            table,
        );
        assert!(matches!(
            result,
            Err(crate::error::Error::Statistics(
                StatisticsError::InconsistentProbabilitySum { .. }
            ))
        ));
    }

    #[test]
    fn test_write_parse_round_trip() {
        let statistics = counted_producer(&[(0, 40), (1, 20), (2, 10)]).produce().unwrap();

        let mut text = Vec::new();
        statistics.write(&mut text).unwrap();
        let text = String::from_utf8(text).unwrap();

        let collection = AlphabetStatisticsCollection::parse(&text).unwrap();
        let reloaded = collection.get("test").unwrap();

        assert_eq!(reloaded.alphabet(), statistics.alphabet());
        assert_eq!(reloaded.original_counts(), statistics.original_counts());
        for &letter in statistics.alphabet() {
            assert_eq!(
                reloaded.huffman_code(letter).unwrap(),
                statistics.huffman_code(letter).unwrap()
            );
        }
    }

    #[test]
    fn test_parse_tolerates_bom_cr_and_blank_lines() {
        let statistics = counted_producer(&[(0, 3), (1, 1)]).produce().unwrap();
        let mut text = Vec::new();
        statistics.write(&mut text).unwrap();
        let body = String::from_utf8(text).unwrap().replace('\n', "\r\n");
        let decorated = format!("\u{feff}\r\n\r\n{body}\r\n");

        let collection = AlphabetStatisticsCollection::parse(&decorated).unwrap();
        assert!(collection.contains("test"));
    }

    #[test]
    fn test_parse_mid_block_eof() {
        let text = "truncated\nnumber_of_letters 4\n";
        assert!(matches!(
            AlphabetStatisticsCollection::parse(text),
            Err(crate::error::Error::Statistics(
                StatisticsError::UnexpectedEndOfDictionary
            ))
        ));
    }

    #[test]
    fn test_parse_duplicate_alphabet() {
        let statistics = counted_producer(&[(0, 3), (1, 1)]).produce().unwrap();
        let mut text = Vec::new();
        statistics.write(&mut text).unwrap();
        statistics.write(&mut text).unwrap();
        let text = String::from_utf8(text).unwrap();

        assert!(matches!(
            AlphabetStatisticsCollection::parse(&text),
            Err(crate::error::Error::Statistics(StatisticsError::DuplicateAlphabet { .. }))
        ));
    }

    #[test]
    fn test_collection_lookup() {
        let statistics = counted_producer(&[(0, 3), (1, 1)]).produce().unwrap();
        let mut text = Vec::new();
        statistics.write(&mut text).unwrap();
        let collection =
            AlphabetStatisticsCollection::parse(&String::from_utf8(text).unwrap()).unwrap();

        assert!(collection.get("test").is_ok());
        assert!(matches!(
            collection.get_by_type(AlphabetType::Adc),
            Err(crate::error::Error::Statistics(StatisticsError::UnknownAlphabet { .. }))
        ));
    }

    #[test]
    fn test_huffman_letter_round_trip() {
        let statistics =
            counted_producer(&[(0, 40), (1, 20), (2, 10), (3, 10), (4, 5)]).produce().unwrap();

        // Every letter survives an encode/decode pass through a package.
        let mut package = crate::package::Package::new();
        for &letter in statistics.alphabet() {
            huffman::encode_letter(&statistics, letter, &mut package).unwrap();
        }
        let mut reader = package.reader();
        for &letter in statistics.alphabet() {
            assert_eq!(huffman::decode_letter(&statistics, &mut reader).unwrap(), letter);
        }
        assert!(reader.at_end());

        // The sequence helpers pad to a byte boundary and honor the
        // expected-count contract.
        let letters: Vec<Letter> = vec![0, 1, 1, 4, 2, 0];
        let mut package = crate::package::Package::new();
        huffman::encode_sequence(&statistics, &letters, &mut package).unwrap();
        assert_eq!(package.size() % 8, 0);
        let mut reader = package.reader();
        let decoded =
            huffman::decode_sequence(&statistics, &mut reader, letters.len()).unwrap();
        assert_eq!(decoded, letters);
    }

    #[test]
    fn test_concurrent_add_count() {
        let producer =
            std::sync::Arc::new(AlphabetStatisticsProducer::with_alphabet("threads", 0..4));
        let mut handles = Vec::new();
        for letter in 0..4 {
            let producer = producer.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    producer.add_count(letter);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(producer.n_counts(), 4000);
        assert_eq!(producer.frequencies().values().sum::<u64>(), 4000);
    }
}
