//! External scanner for Rad's layout tokens.
//!
//! Rad blocks are delimited by indentation. The generated parser asks this
//! scanner for three zero-width tokens: a statement-ending newline, an indent
//! that opens a block, and a dedent that closes one. The scanner keeps a stack
//! of open indentation widths and, after each newline, the width of the next
//! non-blank line until the parser has consumed the indent or dedents it
//! implies.

use std::ffi::{c_char, c_void};
use std::slice;

/// Size of the buffer tree-sitter passes to `serialize`.
const SERIALIZATION_BUFFER_SIZE: usize = 1024;

/// Columns a tab advances the indentation width by.
const TAB_WIDTH: u16 = 4;

/// Number of external tokens declared in grammar.json.
const TOKEN_COUNT: usize = 3;

/// The serialized indent count is a single byte.
pub(crate) const MAX_SERIALIZED_INDENTS: usize = u8::MAX as usize;

/// External tokens, in the order of the grammar's `externals` list.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenType {
    Newline = 0,
    Indent = 1,
    Dedent = 2,
}

/// The parser's set of acceptable external tokens at the current position.
pub(crate) struct ValidSymbols<'a>(&'a [bool]);

impl<'a> ValidSymbols<'a> {
    pub(crate) fn new(flags: &'a [bool]) -> Self {
        Self(flags)
    }

    fn contains(&self, token: TokenType) -> bool {
        self.0.get(token as usize).copied().unwrap_or(false)
    }

    /// During error recovery tree-sitter marks every external token valid.
    /// No grammar state accepts an indent and a dedent at the same time.
    fn in_error_recovery(&self) -> bool {
        self.contains(TokenType::Indent) && self.contains(TokenType::Dedent)
    }
}

/// The subset of `TSLexer` the scanner drives.
pub(crate) trait Lexer {
    /// The current lookahead character, `'\0'` at end of input.
    fn lookahead(&self) -> char;
    /// Consumes the lookahead as part of the token.
    fn advance(&mut self);
    /// Consumes the lookahead as whitespace preceding the token.
    fn skip(&mut self);
    /// Ends the token at the current position.
    fn mark_end(&mut self);
    fn eof(&self) -> bool;
    fn set_result(&mut self, token: TokenType);
}

/// Mirror of `TSLexer` from `tree_sitter/parser.h`.
#[repr(C)]
#[allow(dead_code)]
pub struct TSLexer {
    lookahead: i32,
    result_symbol: u16,
    advance: Option<unsafe extern "C" fn(*mut TSLexer, bool)>,
    mark_end: Option<unsafe extern "C" fn(*mut TSLexer)>,
    get_column: Option<unsafe extern "C" fn(*mut TSLexer) -> u32>,
    is_at_included_range_start: Option<unsafe extern "C" fn(*const TSLexer) -> bool>,
    eof: Option<unsafe extern "C" fn(*const TSLexer) -> bool>,
    log: Option<unsafe extern "C" fn(*const TSLexer, *const c_char, ...)>,
}

/// [`Lexer`] over the lexer tree-sitter hands to `scan`.
struct FfiLexer {
    raw: *mut TSLexer,
}

impl Lexer for FfiLexer {
    fn lookahead(&self) -> char {
        let code = unsafe { (*self.raw).lookahead };
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn advance(&mut self) {
        if let Some(advance) = unsafe { (*self.raw).advance } {
            unsafe { advance(self.raw, false) }
        }
    }

    fn skip(&mut self) {
        if let Some(advance) = unsafe { (*self.raw).advance } {
            unsafe { advance(self.raw, true) }
        }
    }

    fn mark_end(&mut self) {
        if let Some(mark_end) = unsafe { (*self.raw).mark_end } {
            unsafe { mark_end(self.raw) }
        }
    }

    fn eof(&self) -> bool {
        match unsafe { (*self.raw).eof } {
            Some(eof) => unsafe { eof(self.raw) },
            None => true,
        }
    }

    fn set_result(&mut self, token: TokenType) {
        unsafe { (*self.raw).result_symbol = token as u16 }
    }
}

/// Indentation state carried between tokens.
///
/// `indents` always holds at least the top-level width `0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Scanner {
    indents: Vec<u16>,
    pending_indent: Option<u16>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            indents: vec![0],
            pending_indent: None,
        }
    }
}

impl Scanner {
    fn current_indent(&self) -> u16 {
        self.indents.last().copied().unwrap_or(0)
    }

    /// Writes the scanner state into `buffer` and returns the number of bytes
    /// used.
    ///
    /// Layout: a pending flag byte, the pending width as two little-endian
    /// bytes, an indent count byte, then each indent width as two
    /// little-endian bytes, outermost first.
    pub(crate) fn serialize(&self, buffer: &mut [u8]) -> usize {
        const HEADER_LEN: usize = 4;
        if buffer.len() < HEADER_LEN {
            return 0;
        }

        let pending = self.pending_indent.unwrap_or(0).to_le_bytes();
        let capacity = (buffer.len() - HEADER_LEN) / 2;
        let count = self
            .indents
            .len()
            .min(MAX_SERIALIZED_INDENTS)
            .min(capacity);

        buffer[0] = u8::from(self.pending_indent.is_some());
        buffer[1..3].copy_from_slice(&pending);
        buffer[3] = count as u8;

        let mut size = HEADER_LEN;
        for indent in &self.indents[..count] {
            buffer[size..size + 2].copy_from_slice(&indent.to_le_bytes());
            size += 2;
        }
        size
    }

    /// Restores state written by [`Scanner::serialize`]. An empty or truncated
    /// buffer restores as much as it holds; the top-level indent is always
    /// present afterwards.
    pub(crate) fn deserialize(&mut self, buffer: &[u8]) {
        *self = Self::default();

        let [flag, lo, hi, count, rest @ ..] = buffer else {
            return;
        };

        self.indents.clear();
        if *flag != 0 {
            self.pending_indent = Some(u16::from_le_bytes([*lo, *hi]));
        }
        self.indents.extend(
            rest.chunks_exact(2)
                .take(usize::from(*count))
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
        );
        if self.indents.is_empty() {
            self.indents.push(0);
        }
    }

    /// Recognizes the next layout token, if any.
    pub(crate) fn scan(&mut self, lexer: &mut impl Lexer, valid: &ValidSymbols<'_>) -> bool {
        let current = self.current_indent();

        if let Some(pending) = self.pending_indent {
            if valid.contains(TokenType::Indent) && pending > current {
                self.indents.push(pending);
                self.pending_indent = None;
                lexer.set_result(TokenType::Indent);
                return true;
            }

            // A line that closes several blocks produces one dedent per call.
            if valid.contains(TokenType::Dedent) && pending < current && self.indents.len() > 1 {
                self.indents.pop();
                if pending >= self.current_indent() {
                    self.pending_indent = None;
                }
                lexer.set_result(TokenType::Dedent);
                return true;
            }

            if pending == current {
                self.pending_indent = None;
            }
        }

        if lexer.eof() && valid.contains(TokenType::Dedent) && self.indents.len() > 1 {
            self.indents.pop();
            lexer.set_result(TokenType::Dedent);
            return true;
        }

        if !valid.contains(TokenType::Newline) {
            return false;
        }

        while matches!(lexer.lookahead(), ' ' | '\t' | '\r' | '\x0c') && !lexer.eof() {
            lexer.skip();
        }

        // A final statement without a trailing newline still ends.
        if lexer.eof() {
            if valid.in_error_recovery() {
                return false;
            }
            lexer.mark_end();
            self.pending_indent = Some(0);
            lexer.set_result(TokenType::Newline);
            return true;
        }

        if lexer.lookahead() != '\n' {
            return false;
        }

        lexer.skip();
        lexer.mark_end();
        self.pending_indent = Some(next_line_indent(lexer));
        lexer.set_result(TokenType::Newline);
        true
    }
}

/// Measures the indentation of the next line holding code, looking past blank
/// lines and comment-only lines. Everything read here lies beyond the token
/// end and is lexed again as whitespace and comments.
fn next_line_indent(lexer: &mut impl Lexer) -> u16 {
    let mut indent: u16 = 0;
    loop {
        if lexer.eof() {
            return 0;
        }
        match lexer.lookahead() {
            ' ' => indent = indent.saturating_add(1),
            '\t' => indent = indent.saturating_add(TAB_WIDTH),
            '\r' | '\x0c' => {}
            '\n' => indent = 0,
            '/' => {
                lexer.advance();
                if lexer.lookahead() != '/' {
                    return indent;
                }
                while !lexer.eof() && lexer.lookahead() != '\n' {
                    lexer.advance();
                }
                continue;
            }
            _ => return indent,
        }
        lexer.advance();
    }
}

#[no_mangle]
pub extern "C" fn tree_sitter_rad_external_scanner_create() -> *mut c_void {
    Box::into_raw(Box::<Scanner>::default()).cast()
}

/// # Safety
///
/// `payload` must come from [`tree_sitter_rad_external_scanner_create`] and
/// must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn tree_sitter_rad_external_scanner_destroy(payload: *mut c_void) {
    if !payload.is_null() {
        drop(Box::from_raw(payload.cast::<Scanner>()));
    }
}

/// # Safety
///
/// `payload` must be a live scanner and `buffer` must point to at least
/// `TREE_SITTER_SERIALIZATION_BUFFER_SIZE` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn tree_sitter_rad_external_scanner_serialize(
    payload: *mut c_void,
    buffer: *mut c_char,
) -> u32 {
    let scanner = &*payload.cast::<Scanner>();
    let buffer = slice::from_raw_parts_mut(buffer.cast::<u8>(), SERIALIZATION_BUFFER_SIZE);
    scanner.serialize(buffer) as u32
}

/// # Safety
///
/// `payload` must be a live scanner and `buffer` must point to `length`
/// readable bytes.
#[no_mangle]
pub unsafe extern "C" fn tree_sitter_rad_external_scanner_deserialize(
    payload: *mut c_void,
    buffer: *const c_char,
    length: u32,
) {
    let scanner = &mut *payload.cast::<Scanner>();
    let bytes = if buffer.is_null() || length == 0 {
        &[][..]
    } else {
        slice::from_raw_parts(buffer.cast::<u8>(), length as usize)
    };
    scanner.deserialize(bytes);
}

/// # Safety
///
/// `payload` must be a live scanner, `lexer` a valid tree-sitter lexer and
/// `valid_symbols` an array with one flag per external token.
#[no_mangle]
pub unsafe extern "C" fn tree_sitter_rad_external_scanner_scan(
    payload: *mut c_void,
    lexer: *mut TSLexer,
    valid_symbols: *const bool,
) -> bool {
    let scanner = &mut *payload.cast::<Scanner>();
    let valid = ValidSymbols::new(slice::from_raw_parts(valid_symbols, TOKEN_COUNT));
    let mut lexer = FfiLexer { raw: lexer };
    scanner.scan(&mut lexer, &valid)
}
