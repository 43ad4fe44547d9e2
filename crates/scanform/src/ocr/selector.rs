//! Engine selection as a pure function of classifier output, settings and
//! availability.

use super::EngineType;

/// Which engines can currently serve requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub local: bool,
    pub remote: bool,
}

impl Availability {
    pub fn is_available(&self, engine: EngineType) -> bool {
        match engine {
            EngineType::Local => self.local,
            EngineType::Remote => self.remote,
        }
    }
}

/// Why an engine was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    Requested,
    Handwriting,
    Default,
    /// The requested or default engine was unavailable.
    Fallback { wanted: EngineType },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub engine: EngineType,
    pub reason: SelectionReason,
}

/// Picks the engine for one extraction.
///
/// `handwritten` is `None` when the classifier was not consulted. An
/// explicit request bypasses the classifier. Whatever is wanted but
/// unavailable falls back to the local engine; this never fails.
pub fn select_engine(
    requested: Option<EngineType>,
    handwritten: Option<bool>,
    default_engine: EngineType,
    availability: Availability,
) -> Selection {
    let (wanted, reason) = match requested {
        Some(engine) => (engine, SelectionReason::Requested),
        None if handwritten == Some(true) && availability.remote => {
            (EngineType::Remote, SelectionReason::Handwriting)
        }
        None => (default_engine, SelectionReason::Default),
    };

    if wanted == EngineType::Local || availability.is_available(wanted) {
        return Selection {
            engine: wanted,
            reason,
        };
    }

    Selection {
        engine: EngineType::Local,
        reason: SelectionReason::Fallback { wanted },
    }
}
