//! # Endpoint Identifiers
//!
//! Every public `(collection, function)` pair, as a closed enum.
//!
//! The wire strings live only in `names()`. The server registers one handler per variant and the
//! client calls by variant, so a typo in a name cannot compile on one side and not the other.

use wirepack::TypeTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    InputCreate,

    SourceRelease,
    SourceRemove,
    SourceGetId,
    SourceGetName,
    SourceSetName,
    SourceGetSettings,
    SourceUpdate,
    SourceGetFlags,
    SourceSetFlags,
    SourceGetMuted,
    SourceSetMuted,
    SourceGetEnabled,
    SourceSetEnabled,
    SourceGetStatus,

    VolMeterCreate,
    VolMeterDestroy,
    VolMeterAttach,
    VolMeterDetach,
    VolMeterGetUpdateInterval,
    VolMeterSetUpdateInterval,
    VolMeterAddCallback,
    VolMeterRemoveCallback,
    VolMeterQuery,
}

impl Endpoint {
    pub const ALL: &'static [Endpoint] = &[
        Endpoint::InputCreate,
        Endpoint::SourceRelease,
        Endpoint::SourceRemove,
        Endpoint::SourceGetId,
        Endpoint::SourceGetName,
        Endpoint::SourceSetName,
        Endpoint::SourceGetSettings,
        Endpoint::SourceUpdate,
        Endpoint::SourceGetFlags,
        Endpoint::SourceSetFlags,
        Endpoint::SourceGetMuted,
        Endpoint::SourceSetMuted,
        Endpoint::SourceGetEnabled,
        Endpoint::SourceSetEnabled,
        Endpoint::SourceGetStatus,
        Endpoint::VolMeterCreate,
        Endpoint::VolMeterDestroy,
        Endpoint::VolMeterAttach,
        Endpoint::VolMeterDetach,
        Endpoint::VolMeterGetUpdateInterval,
        Endpoint::VolMeterSetUpdateInterval,
        Endpoint::VolMeterAddCallback,
        Endpoint::VolMeterRemoveCallback,
        Endpoint::VolMeterQuery,
    ];

    /// The stable wire names `(collection, function)`.
    pub fn names(self) -> (&'static str, &'static str) {
        match self {
            Endpoint::InputCreate => ("Input", "Create"),

            Endpoint::SourceRelease => ("Source", "Release"),
            Endpoint::SourceRemove => ("Source", "Remove"),
            Endpoint::SourceGetId => ("Source", "GetId"),
            Endpoint::SourceGetName => ("Source", "GetName"),
            Endpoint::SourceSetName => ("Source", "SetName"),
            Endpoint::SourceGetSettings => ("Source", "GetSettings"),
            Endpoint::SourceUpdate => ("Source", "Update"),
            Endpoint::SourceGetFlags => ("Source", "GetFlags"),
            Endpoint::SourceSetFlags => ("Source", "SetFlags"),
            Endpoint::SourceGetMuted => ("Source", "GetMuted"),
            Endpoint::SourceSetMuted => ("Source", "SetMuted"),
            Endpoint::SourceGetEnabled => ("Source", "GetEnabled"),
            Endpoint::SourceSetEnabled => ("Source", "SetEnabled"),
            Endpoint::SourceGetStatus => ("Source", "GetStatus"),

            Endpoint::VolMeterCreate => ("VolMeter", "Create"),
            Endpoint::VolMeterDestroy => ("VolMeter", "Destroy"),
            Endpoint::VolMeterAttach => ("VolMeter", "Attach"),
            Endpoint::VolMeterDetach => ("VolMeter", "Detach"),
            Endpoint::VolMeterGetUpdateInterval => ("VolMeter", "GetUpdateInterval"),
            Endpoint::VolMeterSetUpdateInterval => ("VolMeter", "SetUpdateInterval"),
            Endpoint::VolMeterAddCallback => ("VolMeter", "AddCallback"),
            Endpoint::VolMeterRemoveCallback => ("VolMeter", "RemoveCallback"),
            Endpoint::VolMeterQuery => ("VolMeter", "Query"),
        }
    }

    /// Declared argument types, checked by the dispatcher before a handler runs.
    pub fn params(self) -> Vec<TypeTag> {
        use TypeTag::*;
        match self {
            Endpoint::InputCreate => vec![String, String],

            Endpoint::SourceSetName | Endpoint::SourceUpdate => vec![UInt64, String],
            Endpoint::SourceSetFlags => vec![UInt64, UInt32],
            Endpoint::SourceSetMuted | Endpoint::SourceSetEnabled => vec![UInt64, Int32],
            Endpoint::SourceRelease
            | Endpoint::SourceRemove
            | Endpoint::SourceGetId
            | Endpoint::SourceGetName
            | Endpoint::SourceGetSettings
            | Endpoint::SourceGetFlags
            | Endpoint::SourceGetMuted
            | Endpoint::SourceGetEnabled
            | Endpoint::SourceGetStatus => vec![UInt64],

            Endpoint::VolMeterCreate => vec![Int32],
            Endpoint::VolMeterAttach => vec![UInt64, UInt64],
            Endpoint::VolMeterSetUpdateInterval => vec![UInt64, UInt32],
            Endpoint::VolMeterDestroy
            | Endpoint::VolMeterDetach
            | Endpoint::VolMeterGetUpdateInterval
            | Endpoint::VolMeterAddCallback
            | Endpoint::VolMeterRemoveCallback
            | Endpoint::VolMeterQuery => vec![UInt64],
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (collection, function) = self.names();
        write!(f, "{}.{}", collection, function)
    }
}
