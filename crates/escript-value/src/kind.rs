//! Runtime type tags.
//!
//! Every value carries exactly one [`Kind`]. The tag drives operator
//! dispatch, the wire format (it is the first byte of every packed value)
//! and the `typeof` names scripts observe. Tag `0` is reserved and never
//! produced.

use std::fmt;

/// Closed enumeration of value kinds.
///
/// Discriminants are the wire tags and must stay stable.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Uninit = 1,
    String = 2,
    Integer = 3,
    Float = 4,
    Array = 5,
    ApplicPtr = 6,
    ApplicObj = 7,
    Error = 8,
    Dictionary = 9,
    Struct = 10,
    Packet = 11,
    BinaryFile = 12,
    XmlFile = 13,
    XmlNode = 14,
    XmlAttributes = 15,
    PolCoreRef = 16,
    // Host reference kinds; only ever reported by application objects.
    AccountRef = 17,
    ConfigFileRef = 18,
    ConfigElemRef = 19,
    DataFileRef = 20,
    DataElemRef = 21,
    GuildRef = 22,
    PartyRef = 23,
    BoundingBox = 24,
    DebugContext = 25,
    ScriptExRef = 26,
    Package = 27,
    MenuRef = 28,
    MobileRef = 29,
    OfflineMobileRef = 30,
    ItemRef = 31,
    BoatRef = 32,
    MultiRef = 33,
    ClientRef = 34,
    SqlConnection = 35,
    SqlResultSet = 36,
    SqlRow = 37,
}

impl Kind {
    /// All kinds in tag order.
    pub const ALL: [Kind; 37] = [
        Kind::Uninit,
        Kind::String,
        Kind::Integer,
        Kind::Float,
        Kind::Array,
        Kind::ApplicPtr,
        Kind::ApplicObj,
        Kind::Error,
        Kind::Dictionary,
        Kind::Struct,
        Kind::Packet,
        Kind::BinaryFile,
        Kind::XmlFile,
        Kind::XmlNode,
        Kind::XmlAttributes,
        Kind::PolCoreRef,
        Kind::AccountRef,
        Kind::ConfigFileRef,
        Kind::ConfigElemRef,
        Kind::DataFileRef,
        Kind::DataElemRef,
        Kind::GuildRef,
        Kind::PartyRef,
        Kind::BoundingBox,
        Kind::DebugContext,
        Kind::ScriptExRef,
        Kind::Package,
        Kind::MenuRef,
        Kind::MobileRef,
        Kind::OfflineMobileRef,
        Kind::ItemRef,
        Kind::BoatRef,
        Kind::MultiRef,
        Kind::ClientRef,
        Kind::SqlConnection,
        Kind::SqlResultSet,
        Kind::SqlRow,
    ];

    /// Wire tag of this kind.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a kind by its wire tag.
    pub fn from_tag(tag: u8) -> Option<Kind> {
        let index = usize::from(tag).checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    /// Name reported by `typeof`.
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Uninit => "Uninit",
            Kind::String => "String",
            Kind::Integer => "Integer",
            Kind::Float => "Double",
            Kind::Array => "Array",
            Kind::ApplicPtr => "ApplicPtr",
            Kind::ApplicObj => "ApplicObj",
            Kind::Error => "Error",
            Kind::Dictionary => "Dictionary",
            Kind::Struct => "Struct",
            Kind::Packet => "Packet",
            Kind::BinaryFile => "BinaryFile",
            Kind::XmlFile => "XMLFile",
            Kind::XmlNode => "XMLNode",
            Kind::XmlAttributes => "XMLAttributes",
            Kind::PolCoreRef => "PolCoreRef",
            Kind::AccountRef => "AccountRef",
            Kind::ConfigFileRef => "ConfigFileRef",
            Kind::ConfigElemRef => "ConfigElemRef",
            Kind::DataFileRef => "DataFileRef",
            Kind::DataElemRef => "DataElemRef",
            Kind::GuildRef => "GuildRef",
            Kind::PartyRef => "PartyRef",
            Kind::BoundingBox => "BoundingBox",
            Kind::DebugContext => "DebugContext",
            Kind::ScriptExRef => "ScriptExRef",
            Kind::Package => "Package",
            Kind::MenuRef => "MenuRef",
            Kind::MobileRef => "MobileRef",
            Kind::OfflineMobileRef => "OfflineMobileRef",
            Kind::ItemRef => "ItemRef",
            Kind::BoatRef => "BoatRef",
            Kind::MultiRef => "MultiRef",
            Kind::ClientRef => "ClientRef",
            Kind::SqlConnection => "SQLConnection",
            Kind::SqlResultSet => "SQLResultSet",
            Kind::SqlRow => "SQLRow",
        }
    }

    /// Kinds the binary codec can reconstruct.
    pub const fn is_decodable(self) -> bool {
        matches!(
            self,
            Kind::Uninit
                | Kind::String
                | Kind::Integer
                | Kind::Float
                | Kind::Array
                | Kind::Struct
                | Kind::Error
        )
    }

    /// Host-defined reference kinds (game world handles and friends).
    pub const fn is_host_reference(self) -> bool {
        let tag = self.tag();
        tag >= Kind::PolCoreRef.tag() && tag <= Kind::ClientRef.tag()
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Kind::Integer | Kind::Float)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn test_reserved_and_unknown_tags() {
        assert_eq!(Kind::from_tag(0), None);
        assert_eq!(Kind::from_tag(38), None);
        assert_eq!(Kind::from_tag(u8::MAX), None);
    }

    #[test]
    fn test_tags_are_dense() {
        for (index, kind) in Kind::ALL.iter().enumerate() {
            assert_eq!(usize::from(kind.tag()), index + 1);
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(Kind::Float.name(), "Double");
        assert_eq!(Kind::SqlRow.to_string(), "SQLRow");
        assert_eq!(Kind::Struct.to_string(), "Struct");
    }

    #[test]
    fn test_classification() {
        assert!(Kind::Struct.is_decodable());
        assert!(!Kind::ApplicObj.is_decodable());
        assert!(Kind::ItemRef.is_host_reference());
        assert!(!Kind::SqlRow.is_host_reference());
        assert!(Kind::Integer.is_numeric());
        assert!(!Kind::String.is_numeric());
    }
}
