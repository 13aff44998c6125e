//! Topic and payload formatting
//!
//! Formats are fixed per metric and consumed verbatim downstream, so each one
//! is spelled out here instead of being left to `Display` defaults.

use core::fmt::Write;
use core::net::Ipv4Addr;

use heapless::String;

/// Capacity of a single metric value
pub const PAYLOAD_LEN: usize = 32;

/// Capacity of a full topic (`<prefix>/<suffix>`)
pub const TOPIC_LEN: usize = 128;

/// Capacity of the startup announcement
pub const STARTUP_LEN: usize = 192;

pub type Payload = String<PAYLOAD_LEN>;
pub type Topic = String<TOPIC_LEN>;

/// Formatting did not fit in the fixed buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overflow;

impl From<core::fmt::Error> for Overflow {
    fn from(_: core::fmt::Error) -> Self {
        Overflow
    }
}

/// Join the prefix and a topic suffix
pub fn topic(prefix: &str, suffix: &str) -> Result<Topic, Overflow> {
    let mut t = Topic::new();
    write!(t, "{}/{}", prefix, suffix)?;
    Ok(t)
}

/// Topic for one self-test field: `tests/<name>/<field>`
pub fn test_topic(prefix: &str, name: &str, field: &str) -> Result<Topic, Overflow> {
    let mut t = Topic::new();
    write!(t, "{}/tests/{}/{}", prefix, name, field)?;
    Ok(t)
}

/// Plain integer
pub fn integer<N: core::fmt::Display>(value: N) -> Result<Payload, Overflow> {
    let mut p = Payload::new();
    write!(p, "{}", value)?;
    Ok(p)
}

/// Fixed number of decimals
pub fn decimal(value: f64, places: usize) -> Result<Payload, Overflow> {
    let mut p = Payload::new();
    write!(p, "{:.*}", places, value)?;
    Ok(p)
}

/// Used share of a memory pool in percent, `None` for an empty pool
pub fn used_percent(free: u32, total: u32) -> Option<f32> {
    if total == 0 {
        return None;
    }
    Some(100.0 - (100.0 * free as f32 / total as f32))
}

/// Retained announcement sent after every successful connect
///
/// `{"hostname":"<h>","version":"<v>","ip":"<a.b.c.d>","uptime":0}`
pub fn startup_json(
    hostname: &str,
    version: &str,
    ip: Option<Ipv4Addr>,
) -> Result<String<STARTUP_LEN>, Overflow> {
    let mut s = String::new();
    s.push_str("{\"hostname\":\"").map_err(|_| Overflow)?;
    push_escaped(&mut s, hostname)?;
    s.push_str("\",\"version\":\"").map_err(|_| Overflow)?;
    push_escaped(&mut s, version)?;
    write!(
        s,
        "\",\"ip\":\"{}\",\"uptime\":0}}",
        ip.unwrap_or(Ipv4Addr::UNSPECIFIED)
    )?;
    Ok(s)
}

fn push_escaped<const N: usize>(out: &mut String<N>, text: &str) -> Result<(), Overflow> {
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\').map_err(|_| Overflow)?;
        }
        out.push(c).map_err(|_| Overflow)?;
    }
    Ok(())
}
