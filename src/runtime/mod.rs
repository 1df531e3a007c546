//! Host side of the language's builtins.
//!
//! Generated code calls `print` through a single host function that takes
//! the format string, a pointer to the argument words, a pointer to one
//! [`WordTag`] byte per word, and the word count. Output goes to stdout
//! unless the current thread is inside [`capture`].

pub mod format;

use std::cell::RefCell;
use std::ffi::{c_char, CStr};
use std::io::{self, Write};

use crate::ir::Type;
use format::Word;

/// What a `print` argument word holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WordTag {
    Int = 0,
    Double = 1,
    Str = 2,
}

impl WordTag {
    /// Tag for a value of IR type `ty`. Bools are passed as integers.
    pub fn of(ty: Type) -> WordTag {
        match ty {
            Type::Float64 => WordTag::Double,
            Type::BytePtr => WordTag::Str,
            Type::Int64 | Type::Bool | Type::Void => WordTag::Int,
        }
    }

    fn word(tag: u8, bits: i64) -> Word {
        match tag {
            t if t == WordTag::Double as u8 => Word::Double(f64::from_bits(bits as u64)),
            t if t == WordTag::Str as u8 => Word::Str(bits),
            _ => Word::Int(bits),
        }
    }
}

thread_local! {
    static CAPTURE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Run `f`, collecting everything generated code prints on this thread.
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, String) {
    let previous = CAPTURE.with(|c| c.replace(Some(String::new())));
    let out = f();
    let captured = CAPTURE.with(|c| c.replace(previous)).unwrap_or_default();
    (out, captured)
}

fn emit(text: &str) {
    let captured = CAPTURE.with(|c| match c.borrow_mut().as_mut() {
        Some(buf) => {
            buf.push_str(text);
            true
        }
        None => false,
    });
    if !captured {
        let mut stdout = io::stdout().lock();
        if let Err(err) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
            log::warn!("print: failed to write to stdout: {}", err);
        }
    }
}

/// `print(format, args...)` as called from generated code.
pub(crate) extern "C" fn sable_print(
    format: *const c_char,
    args: *const i64,
    tags: *const u8,
    count: i64,
) {
    if format.is_null() {
        return;
    }
    // SAFETY: generated code passes the address of a NUL-terminated string global.
    let fmt = unsafe { CStr::from_ptr(format) }.to_bytes();
    let words: Vec<Word> = if args.is_null() || tags.is_null() || count <= 0 {
        Vec::new()
    } else {
        // SAFETY: generated code stores `count` words at `args` and `count`
        // tag bytes at `tags`, both in stack slots of the calling frame.
        let (bits, tags) = unsafe {
            (
                std::slice::from_raw_parts(args, count as usize),
                std::slice::from_raw_parts(tags, count as usize),
            )
        };
        bits.iter()
            .zip(tags)
            .map(|(&bits, &tag)| WordTag::word(tag, bits))
            .collect()
    };
    emit(&format::format(fmt, &words, read_c_string));
}

fn read_c_string(word: i64) -> String {
    let ptr = word as usize as *const c_char;
    if ptr.is_null() {
        return "(null)".to_string();
    }
    // SAFETY: only words tagged `Str` reach here, and those are addresses
    // of string globals.
    unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}
