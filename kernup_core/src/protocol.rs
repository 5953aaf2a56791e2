/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::protocol
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Line protocol between the privileged kernel data helper
    and its unprivileged consumers.

  Security / Safety Notes:
    Output is ASCII only; anything else travels as numeric
    character references. A single error sentinel voids the
    whole batch.

  Dependencies:
    None beyond std.

  Operational Scope:
    `kernels` output of the CLI and every consumer of it.

  Revision History:
    2026-03-14 COD  Introduced kernel record codec.
    2026-04-20 COD  Escape ampersands so records round-trip.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Fail whole batches, never half-trust them
    - ASCII-safe wire format
============================================================*/

//! Record layout, fields separated by `###`:
//!
//! ```text
//! KERNEL###<dotted key>###<version>###<package version>###<installed 0|1|2>
//!       ###<active 0|1>###<origin 0..4>###<archive>###<support months|-1|>###<flavor>
//! ```

use std::fmt::Write as _;

use crate::error::{KernupError, Result};
use crate::kernel::{Flavor, InstallState, Origin};
use crate::version::VersionKey;

pub const RECORD_TAG: &str = "KERNEL";
pub const ERROR_TAG: &str = "ERROR";
pub const FIELD_SEPARATOR: &str = "###";
pub const FIELD_COUNT: usize = 10;

const ERROR_FIELDS: usize = 4;

/// Support duration field of a kernel record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportDuration {
    /// Empty field, used by mainline records.
    Unspecified,
    /// `0`: no support information.
    Unsupported,
    Months(u32),
    /// `-1`: derive from the hardware enablement window.
    HweWindow,
}

impl SupportDuration {
    pub fn parse(field: &str) -> Option<Self> {
        match field.trim() {
            "" => Some(SupportDuration::Unspecified),
            "0" => Some(SupportDuration::Unsupported),
            "-1" => Some(SupportDuration::HweWindow),
            other => other.parse().ok().map(SupportDuration::Months),
        }
    }

    pub fn as_field(self) -> String {
        match self {
            SupportDuration::Unspecified => String::new(),
            SupportDuration::Unsupported => "0".into(),
            SupportDuration::HweWindow => "-1".into(),
            SupportDuration::Months(months) => months.to_string(),
        }
    }

    /// Whether the kernel takes part in distro support computation.
    pub fn is_supported(self) -> bool {
        matches!(self, SupportDuration::Months(_) | SupportDuration::HweWindow)
    }
}

/// One kernel line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelRecord {
    pub key: VersionKey,
    pub version: String,
    pub package_version: String,
    pub installed: InstallState,
    pub in_use: bool,
    pub origin: Origin,
    pub archive: String,
    pub support: SupportDuration,
    pub flavor: Flavor,
}

impl KernelRecord {
    /// Record for an installable mainline version such as `6.5-rc3`.
    pub fn mainline(catalog_version: &str, flavor: Flavor) -> Self {
        let key = VersionKey::parse(catalog_version);
        Self {
            version: key.display_version(),
            key,
            package_version: catalog_version.to_string(),
            installed: InstallState::NotInstalled,
            in_use: false,
            origin: Origin::Mainline,
            archive: String::new(),
            support: SupportDuration::Unspecified,
            flavor,
        }
    }

    pub fn encode(&self) -> String {
        let fields = [
            RECORD_TAG.to_string(),
            self.key.dotted(),
            self.version.clone(),
            self.package_version.clone(),
            self.installed.code().to_string(),
            u8::from(self.in_use).to_string(),
            self.origin.code().to_string(),
            self.archive.clone(),
            self.support.as_field(),
            self.flavor.suffix().to_string(),
        ];
        escape(&fields.join(FIELD_SEPARATOR))
    }

    /// Distro series the kernel was published for, e.g. `jammy` of `jammy-updates`.
    pub fn release(&self) -> &str {
        self.archive.split('-').next().unwrap_or_default()
    }

    /// `major.minor` taken from the version text, e.g. `5.15` of `5.15.0-60`.
    pub fn series_label(&self) -> String {
        let normalized = self.version.replace('-', ".");
        let mut parts = normalized.split('.');
        match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) => format!("{major}.{minor}"),
            (Some(major), None) => major.to_string(),
            _ => String::new(),
        }
    }

    fn decode(line: &str) -> Option<Self> {
        let fields: Vec<String> = line.split(FIELD_SEPARATOR).map(unescape).collect();
        if fields.len() != FIELD_COUNT || fields[0] != RECORD_TAG {
            return None;
        }
        let installed = InstallState::from_code(fields[4].parse().ok()?)?;
        let in_use = match fields[5].as_str() {
            "1" => true,
            "0" => false,
            _ => return None,
        };
        let origin = Origin::from_code(fields[6].parse().ok()?)?;
        Some(Self {
            key: VersionKey::from_dotted(&fields[3], &fields[1])?,
            version: fields[2].clone(),
            package_version: fields[3].clone(),
            installed,
            in_use,
            origin,
            archive: fields[7].clone(),
            support: SupportDuration::parse(&fields[8])?,
            flavor: fields[9].parse().ok()?,
        })
    }
}

/// The fatal failure line of the data helper.
pub fn error_line() -> String {
    vec![ERROR_TAG; ERROR_FIELDS].join(FIELD_SEPARATOR)
}

fn is_error_sentinel(line: &str) -> bool {
    let mut fields = line.split(FIELD_SEPARATOR);
    let count = fields.clone().count();
    count > 1 && fields.all(|field| field.trim() == ERROR_TAG)
}

/// Decode a batch of helper output.
///
/// Lines that are not well-formed records are skipped. An error sentinel
/// anywhere voids the whole batch.
pub fn decode_batch(text: &str) -> Result<Vec<KernelRecord>> {
    let mut records = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if is_error_sentinel(line) {
            return Err(KernupError::HelperReported(
                "kernel data could not be gathered".into(),
            ));
        }
        if let Some(record) = KernelRecord::decode(line) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Replace non-ASCII characters and `&` with numeric character references.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii() && ch != '&' {
            out.push(ch);
        } else {
            let _ = write!(out, "&#{};", u32::from(ch));
        }
    }
    out
}

/// Decode decimal (`&#233;`) and hexadecimal (`&#xE9;`) character references.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("&#") {
        out.push_str(&rest[..start]);
        let candidate = &rest[start + 2..];
        match decode_reference(candidate) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &candidate[consumed..];
            }
            None => {
                out.push_str("&#");
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(text: &str) -> Option<(char, usize)> {
    let end = text.find(';')?;
    let body = &text[..end];
    let code = match body.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => body.parse().ok()?,
    };
    Some((char::from_u32(code)?, end + 1))
}
