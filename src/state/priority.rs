//! Link priority normalization and the priority queues links are sorted into

use crate::state::ChangeFreq;

/// Priority assigned to links without a sitemap hint
pub const DEFAULT_PRIORITY: f64 = 0.5;

/// Normalizes a priority into `[0.0, 1.0]` at one decimal place
///
/// NaN has no meaningful position and falls back to [`DEFAULT_PRIORITY`].
///
/// # Examples
///
/// ```
/// use sumi_lattice::state::normalize_priority;
///
/// assert_eq!(normalize_priority(1.37), 1.0);
/// assert_eq!(normalize_priority(-0.2), 0.0);
/// assert_eq!(normalize_priority(0.643), 0.6);
/// ```
pub fn normalize_priority(priority: f64) -> f64 {
    if priority.is_nan() {
        return DEFAULT_PRIORITY;
    }
    let clamped = priority.clamp(0.0, 1.0);
    (clamped * 10.0).round() / 10.0
}

/// The three priority bands the prioritizer publishes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityLevel {
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub const ALL: [PriorityLevel; 3] = [Self::High, Self::Medium, Self::Low];

    /// Name of the queue holding links of this priority
    pub fn queue_name(&self) -> &'static str {
        match self {
            Self::High => "high_priority_links",
            Self::Medium => "medium_priority_links",
            Self::Low => "low_priority_links",
        }
    }

    /// Classifies a link into a priority band
    ///
    /// Returns `None` for links that should never be crawled again.
    ///
    /// | Condition | Band |
    /// |-----------|------|
    /// | `never` | dropped |
    /// | `weekly` | medium |
    /// | priority >= 0.7 | high |
    /// | `yearly` or `monthly` | low |
    /// | priority >= 0.5 | medium |
    /// | otherwise | low |
    pub fn classify(change_freq: ChangeFreq, priority: f64) -> Option<Self> {
        match change_freq {
            ChangeFreq::Never => None,
            ChangeFreq::Weekly => Some(Self::Medium),
            _ if priority >= 0.7 => Some(Self::High),
            ChangeFreq::Yearly | ChangeFreq::Monthly => Some(Self::Low),
            _ if priority >= 0.5 => Some(Self::Medium),
            _ => Some(Self::Low),
        }
    }
}
