//! printf-style formatting over tagged 64-bit argument words.
//!
//! Generated code passes every argument as one word plus a tag saying what
//! the word holds. Numeric conversions reinterpret any word; `%s` only
//! dereferences words tagged as strings. Length modifiers are accepted and
//! ignored since every word is 64 bits wide.

/// One `print` argument as received from generated code.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Word {
    Int(i64),
    Double(f64),
    /// Address of a NUL-terminated string.
    Str(i64),
}

impl Word {
    fn bits(self) -> i64 {
        match self {
            Word::Int(v) | Word::Str(v) => v,
            Word::Double(x) => x.to_bits() as i64,
        }
    }
}

/// Text printed by `%s` for a word that is not a string.
pub const NOT_A_STRING: &str = "(not a string)";

#[derive(Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    width: usize,
    precision: Option<usize>,
}

impl Spec {
    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }
}

/// Format `fmt` with `args`. `read_str` turns the address in a
/// [`Word::Str`] into text. Conversions without a matching argument read
/// zero, and `%s` without one reads a null string.
pub fn format(fmt: &[u8], args: &[Word], read_str: impl Fn(i64) -> String) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(fmt.len());
    let mut args = args.iter().copied();
    let mut i = 0;

    while i < fmt.len() {
        if fmt[i] != b'%' {
            out.push(fmt[i]);
            i += 1;
            continue;
        }
        let start = i;
        i += 1;

        let mut spec = Spec::default();
        while let Some(&flag) = fmt.get(i) {
            match flag {
                b'-' => spec.left = true,
                b'0' => spec.zero = true,
                b'+' => spec.plus = true,
                b' ' => spec.space = true,
                _ => break,
            }
            i += 1;
        }
        spec.width = digits(fmt, &mut i).unwrap_or(0);
        if fmt.get(i) == Some(&b'.') {
            i += 1;
            spec.precision = Some(digits(fmt, &mut i).unwrap_or(0));
        }
        while matches!(fmt.get(i), Some(b'h' | b'l' | b'z' | b'j' | b't' | b'L')) {
            i += 1;
        }

        let Some(&conv) = fmt.get(i) else {
            out.extend_from_slice(&fmt[start..]);
            break;
        };
        i += 1;

        let text = match conv {
            b'%' => "%".to_string(),
            b'd' | b'i' => {
                let value = bits(&mut args);
                integer(spec.sign(value < 0), value.unsigned_abs().to_string(), &spec)
            }
            b'u' => integer("", (bits(&mut args) as u64).to_string(), &spec),
            b'x' => integer("", format!("{:x}", bits(&mut args) as u64), &spec),
            b'X' => integer("", format!("{:X}", bits(&mut args) as u64), &spec),
            b'o' => integer("", format!("{:o}", bits(&mut args) as u64), &spec),
            b'f' | b'F' => float(f64::from_bits(bits(&mut args) as u64), &spec),
            b's' => {
                let text = match args.next() {
                    Some(Word::Str(addr)) => read_str(addr),
                    Some(_) => NOT_A_STRING.to_string(),
                    None => read_str(0),
                };
                let text = match spec.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                };
                pad_spaces(text, &spec)
            }
            b'c' => {
                let byte = bits(&mut args) as u8;
                let fill = spec.width.saturating_sub(1);
                if !spec.left {
                    out.extend(std::iter::repeat(b' ').take(fill));
                }
                out.push(byte);
                if spec.left {
                    out.extend(std::iter::repeat(b' ').take(fill));
                }
                continue;
            }
            _ => {
                out.extend_from_slice(&fmt[start..i]);
                continue;
            }
        };
        out.extend_from_slice(text.as_bytes());
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn bits(args: &mut impl Iterator<Item = Word>) -> i64 {
    args.next().map_or(0, Word::bits)
}

fn digits(fmt: &[u8], i: &mut usize) -> Option<usize> {
    let start = *i;
    while fmt.get(*i).is_some_and(u8::is_ascii_digit) {
        *i += 1;
    }
    std::str::from_utf8(&fmt[start..*i]).ok()?.parse().ok()
}

fn integer(sign: &str, mut digits: String, spec: &Spec) -> String {
    if let Some(precision) = spec.precision {
        if precision == 0 && digits == "0" {
            digits.clear();
        } else if digits.len() < precision {
            digits.insert_str(0, &"0".repeat(precision - digits.len()));
        }
    }
    // An explicit precision turns off zero padding for integers.
    pad_number(sign, &digits, spec, spec.precision.is_none())
}

fn float(value: f64, spec: &Spec) -> String {
    let sign = spec.sign(value.is_sign_negative() && !value.is_nan());
    if value.is_nan() {
        return pad_number(sign, "nan", spec, false);
    }
    if value.is_infinite() {
        return pad_number(sign, "inf", spec, false);
    }
    let body = format!("{:.*}", spec.precision.unwrap_or(6), value.abs());
    pad_number(sign, &body, spec, true)
}

fn pad_number(sign: &str, body: &str, spec: &Spec, zero_ok: bool) -> String {
    let len = sign.len() + body.len();
    let fill = spec.width.saturating_sub(len);
    if spec.left {
        format!("{}{}{}", sign, body, " ".repeat(fill))
    } else if spec.zero && zero_ok {
        format!("{}{}{}", sign, "0".repeat(fill), body)
    } else {
        format!("{}{}{}", " ".repeat(fill), sign, body)
    }
}

fn pad_spaces(text: String, spec: &Spec) -> String {
    let fill = spec.width.saturating_sub(text.chars().count());
    if fill == 0 {
        text
    } else if spec.left {
        format!("{}{}", text, " ".repeat(fill))
    } else {
        format!("{}{}", " ".repeat(fill), text)
    }
}
