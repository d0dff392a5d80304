//! Module arguments given at load time, e.g. `major=240`.
//!
//! References: <https://elixir.bootlin.com/linux/v6.6/source/kernel/params.c>

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use axerrno::{LinuxError, LinuxResult};

/// Longest string accepted for a `charp`-like parameter.
const MAX_STRING_PARAM: usize = 1024;

/// A type a module parameter can be parsed into.
pub trait ParamValue: Sized {
    /// `val` is `None` when the key was given without `=`.
    fn parse(val: Option<&str>) -> LinuxResult<Self>;
}

fn parse_base<T>(s: &str) -> LinuxResult<T>
where
    T: TryFrom<i128>,
{
    let s = s.trim();

    let (digits, radix) = if s.starts_with("0x") || s.starts_with("0X") {
        (&s[2..], 16)
    } else if s.starts_with('0') && s.len() > 1 {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    // A sign may only come before the prefix.
    if radix != 10 && digits.starts_with(['+', '-']) {
        return Err(LinuxError::EINVAL);
    }
    let v = i128::from_str_radix(digits, radix).map_err(|_| LinuxError::EINVAL)?;

    T::try_from(v).map_err(|_| LinuxError::EINVAL)
}

macro_rules! impl_int_param {
    ($($ty:ty),*) => {
        $(
            impl ParamValue for $ty {
                fn parse(val: Option<&str>) -> LinuxResult<Self> {
                    parse_base::<$ty>(val.ok_or(LinuxError::EINVAL)?)
                }
            }
        )*
    };
}

impl_int_param!(u8, u16, u32, u64, i16, i32, i64, usize);

impl ParamValue for bool {
    // One of =[yYnN01]
    fn parse(val: Option<&str>) -> LinuxResult<Self> {
        // No equals means "set"...
        match val.map(str::trim) {
            None | Some("y") | Some("Y") | Some("1") => Ok(true),
            Some("n") | Some("N") | Some("0") => Ok(false),
            _ => Err(LinuxError::EINVAL),
        }
    }
}

impl ParamValue for String {
    fn parse(val: Option<&str>) -> LinuxResult<Self> {
        let val = val.ok_or(LinuxError::EINVAL)?;
        if val.len() > MAX_STRING_PARAM {
            return Err(LinuxError::ENOSPC);
        }
        Ok(val.to_string())
    }
}

/// Parse a string to get a param value pair.
/// You can use " around spaces, but can't escape ".
fn next_arg(args: &str) -> (&str, Option<&str>, &str) {
    let bytes = args.as_bytes();
    let mut in_quote = false;
    let mut quoted = false;
    let mut start = 0;

    if bytes.first() == Some(&b'"') {
        start = 1;
        in_quote = true;
        quoted = true;
    }

    let mut idx = start;
    while idx < bytes.len() {
        let b = bytes[idx];
        if b.is_ascii_whitespace() && !in_quote {
            break;
        }
        if b == b'"' {
            in_quote = !in_quote;
        }
        idx += 1;
    }

    let mut token = &args[start..idx];
    if quoted {
        token = token.strip_suffix('"').unwrap_or(token);
    }
    let (param, val) = match token.split_once('=') {
        Some((param, val)) => {
            // Don't include quotes in value.
            let val = match val.strip_prefix('"') {
                Some(inner) => inner.strip_suffix('"').unwrap_or(inner),
                None => val,
            };
            (param, Some(val))
        }
        None => (token, None),
    };
    (param, val, args[idx..].trim_start())
}

fn dash2underscore(c: u8) -> u8 {
    if c == b'-' { b'_' } else { c }
}

/// Hyphens and underscores are equivalent in parameter names.
fn parameq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .all(|(x, y)| dash2underscore(x) == dash2underscore(y))
}

/// Parsed `key[=value]` pairs for one module load.
#[derive(Debug, Clone, Default)]
pub struct ModuleArgs {
    doing: String,
    kv: Vec<(String, Option<String>)>,
}

impl ModuleArgs {
    /// Split `args` into parameters. Parsing stops at a bare `--`.
    pub fn parse(doing: &str, args: &str) -> Self {
        log::debug!("[{}]: parsing args '{}'", doing, args);
        let mut kv = Vec::new();
        let mut rest = args.trim_start();
        while !rest.is_empty() {
            let (param, val, next) = next_arg(rest);
            rest = next;
            // Stop at --
            if val.is_none() && param == "--" {
                break;
            }
            kv.push((param.to_string(), val.map(ToString::to_string)));
        }
        Self {
            doing: doing.to_string(),
            kv,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kv.is_empty()
    }

    pub fn len(&self) -> usize {
        self.kv.len()
    }

    /// Value of `name`, parsed as `T`. The last occurrence wins.
    pub fn get<T: ParamValue>(&self, name: &str) -> LinuxResult<Option<T>> {
        let Some((key, val)) = self.kv.iter().rev().find(|(k, _)| parameq(k, name)) else {
            return Ok(None);
        };
        match T::parse(val.as_deref()) {
            Ok(v) => Ok(Some(v)),
            Err(LinuxError::ENOSPC) => {
                log::error!(
                    "[{}]: '{:?}' too large for parameter '{}'",
                    self.doing,
                    val,
                    key
                );
                Err(LinuxError::ENOSPC)
            }
            Err(e) => {
                log::error!(
                    "[{}]: '{:?}' invalid for parameter '{}'",
                    self.doing,
                    val,
                    key
                );
                Err(e)
            }
        }
    }

    /// Fail with `ENOENT` on the first parameter not listed in `known`.
    pub fn reject_unknown(&self, known: &[&str]) -> LinuxResult<()> {
        for (key, _) in &self.kv {
            if !known.iter().any(|k| parameq(k, key)) {
                log::error!("[{}]: Unknown parameter '{}'", self.doing, key);
                return Err(LinuxError::ENOENT);
            }
        }
        Ok(())
    }
}
