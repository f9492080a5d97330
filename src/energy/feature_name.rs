// src/energy/feature_name.rs
//! Feature name parsing
//!
//! Names follow the `<signal><transforms>-<statistic>()[-<axis>]` convention,
//! e.g. `tTotalAccJerkMagSq-iqr()` or `tTotalAcc-mean()-X`.

/// Signal transform chain applied before the statistic.
/// The declaration order is the order partitions are costed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transform {
    JerkMagSq,
    MagSq,
    JerkL1Norm,
    L1Norm,
    Jerk,
    Normal,
}

impl Transform {
    pub const ALL: [Transform; 6] = [
        Transform::JerkMagSq,
        Transform::MagSq,
        Transform::JerkL1Norm,
        Transform::L1Norm,
        Transform::Jerk,
        Transform::Normal,
    ];

    /// Most specific match first: `JerkMagSq` also contains `MagSq` and `Jerk`
    pub fn of(name: &str) -> Self {
        if name.contains("JerkMagSq") {
            Transform::JerkMagSq
        } else if name.contains("MagSq") {
            Transform::MagSq
        } else if name.contains("JerkL1Norm") {
            Transform::JerkL1Norm
        } else if name.contains("L1Norm") {
            Transform::L1Norm
        } else if name.contains("Jerk") {
            Transform::Jerk
        } else {
            Transform::Normal
        }
    }
}

/// A feature (group) name split into the parts the energy model cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureName<'a> {
    pub name: &'a str,
    /// Statistic, e.g. `mean` for `tTotalAcc-mean()`; empty if the name has none
    pub kind: &'a str,
    pub transform: Transform,
    /// Computed and sent once per axis
    pub multiaxial: bool,
}

impl<'a> FeatureName<'a> {
    pub fn parse(name: &'a str) -> Self {
        Self {
            name,
            kind: feature_type(name).unwrap_or(""),
            transform: Transform::of(name),
            multiaxial: is_multiaxial(name),
        }
    }
}

/// Statistic part of the name: second dash-separated token without its `()`
pub fn feature_type(name: &str) -> Option<&str> {
    let token = name.split('-').nth(1)?;
    Some(token.strip_suffix("()").unwrap_or(token))
}

/// Magnitude and norm transforms collapse the three axes into one
pub fn is_multiaxial(name: &str) -> bool {
    !(name.contains("L1Norm") || name.contains("Mag"))
}
