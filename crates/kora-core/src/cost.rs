//! Segment cost calculation
//!
//! A message costs one credit per segment. Bodies made only of printable 7-bit
//! ASCII characters (space through `~`) split into 160-character segments; a
//! single character outside that range, control characters included, switches
//! the whole body to 70-character segments.

use rust_decimal::Decimal;

/// Characters per segment for printable 7-bit bodies
pub const ASCII_SEGMENT_SIZE: usize = 160;

/// Characters per segment when any character is outside printable ASCII
pub const UNICODE_SEGMENT_SIZE: usize = 70;

/// Segment size that applies to `body`
pub fn segment_size(body: &str) -> usize {
    if body.chars().all(is_printable_ascii) {
        ASCII_SEGMENT_SIZE
    } else {
        UNICODE_SEGMENT_SIZE
    }
}

fn is_printable_ascii(c: char) -> bool {
    (' '..='~').contains(&c)
}

/// Number of billable segments; 0 for an empty body
pub fn segments(body: &str) -> u32 {
    let len = body.chars().count();
    if len == 0 {
        return 0;
    }
    len.div_ceil(segment_size(body)) as u32
}

/// Credit cost of `body`
pub fn cost(body: &str) -> Decimal {
    Decimal::from(segments(body))
}
