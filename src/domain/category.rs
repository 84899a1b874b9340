// ============================================================
// Layer 3 — Categorical Vocabularies
// ============================================================
// Every string-valued column of the dataset has a small, closed
// vocabulary. Each one becomes a plain Rust enum so a validated
// FeatureRecord can never hold a value outside it.
//
// The `categorical!` macro generates, per vocabulary:
//   - the enum itself
//   - the wire label of each variant (exactly as it appears in
//     student-mat.csv and in request bodies)
//   - an implementation of the `Categorical` trait below

use serde::Serialize;
use std::fmt;

/// Shared behaviour of every categorical column.
pub trait Categorical: Copy + Sized + 'static {
    /// All accepted labels, in declaration order.
    const LABELS: &'static [&'static str];

    /// Parse a wire label. Matching is exact (case-sensitive).
    fn parse(label: &str) -> Option<Self>;

    /// The wire label of this value.
    fn as_str(self) -> &'static str;

    /// Placeholder used while collecting validation errors.
    fn placeholder() -> Self;
}

macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident { $first:ident => $first_label:literal $(, $variant:ident => $label:literal)* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            #[serde(rename = $first_label)]
            $first,
            $(
                #[serde(rename = $label)]
                $variant,
            )*
        }

        impl Categorical for $name {
            const LABELS: &'static [&'static str] = &[$first_label $(, $label)*];

            fn parse(label: &str) -> Option<Self> {
                match label {
                    $first_label => Some($name::$first),
                    $($label => Some($name::$variant),)*
                    _ => None,
                }
            }

            fn as_str(self) -> &'static str {
                match self {
                    $name::$first => $first_label,
                    $($name::$variant => $label,)*
                }
            }

            fn placeholder() -> Self {
                $name::$first
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

categorical! {
    /// `school`: Gabriel Pereira or Mousinho da Silveira
    School { Gp => "GP", Ms => "MS" }
}

categorical! {
    /// `sex`
    Sex { Female => "F", Male => "M" }
}

categorical! {
    /// `address`: urban or rural home
    Address { Urban => "U", Rural => "R" }
}

categorical! {
    /// `famsize`: at most three, or more than three
    FamilySize { AtMostThree => "LE3", MoreThanThree => "GT3" }
}

categorical! {
    /// `Pstatus`: parents living together or apart
    ParentStatus { Together => "T", Apart => "A" }
}

categorical! {
    /// `Mjob` and `Fjob`
    Job {
        Teacher  => "teacher",
        Health   => "health",
        Services => "services",
        AtHome   => "at_home",
        Other    => "other",
    }
}

categorical! {
    /// `reason` for choosing the school
    Reason {
        Home       => "home",
        Reputation => "reputation",
        Course     => "course",
        Other      => "other",
    }
}

categorical! {
    /// `guardian`
    Guardian { Mother => "mother", Father => "father", Other => "other" }
}
