//! Bidding-zone registry.
//!
//! Maps ENTSO-E EIC area codes to the short names used throughout the store
//! (`DE`, `FR`, `DE-LU`, …). The registry is intentionally small: it covers
//! the zones this service mirrors, not the full ENTSO-E code list.

use std::fmt;

/// A bidding zone / market area recognized by the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaCode {
    /// EIC code sent to the API (e.g. `10Y1001A1001A83F`).
    code: &'static str,
    /// Short market-area name used as `area_code` in the store, when one exists.
    country_code: Option<&'static str>,
    /// Human-readable description from the ENTSO-E code list.
    description: &'static str,
}

impl AreaCode {
    pub const GERMANY: AreaCode = AreaCode {
        code: "10Y1001A1001A83F",
        country_code: Some("DE"),
        description: "Germany",
    };
    pub const FRANCE: AreaCode = AreaCode {
        code: "10YFR-RTE------C",
        country_code: Some("FR"),
        description: "France (FR)",
    };
    pub const NETHERLANDS: AreaCode = AreaCode {
        code: "10YNL----------L",
        country_code: Some("NL"),
        description: "Netherlands (NL)",
    };
    pub const DE_LU: AreaCode = AreaCode {
        code: "10Y1001A1001A82H",
        country_code: Some("DE-LU"),
        description: "DE-LU bidding zone",
    };
    pub const DE_AT_LU: AreaCode = AreaCode {
        code: "10Y1001A1001A63L",
        country_code: Some("DE-AT-LU"),
        description: "DE-AT-LU bidding zone",
    };
    pub const AUSTRIA: AreaCode = AreaCode {
        code: "10YAT-APG------L",
        country_code: Some("AT"),
        description: "Austria (AT)",
    };
    pub const BELGIUM: AreaCode = AreaCode {
        code: "10YBE----------2",
        country_code: Some("BE"),
        description: "Belgium (BE)",
    };
    pub const SWITZERLAND: AreaCode = AreaCode {
        code: "10YCH-SWISSGRIDZ",
        country_code: Some("CH"),
        description: "Switzerland (CH)",
    };
    pub const SPAIN: AreaCode = AreaCode {
        code: "10YES-REE------0",
        country_code: Some("ES"),
        description: "Spain (ES)",
    };
    pub const ITALY: AreaCode = AreaCode {
        code: "10YIT-GRTN-----B",
        country_code: Some("IT"),
        description: "Italy (IT)",
    };
    pub const POLAND: AreaCode = AreaCode {
        code: "10YPL-AREA-----S",
        country_code: Some("PL"),
        description: "Poland (PL)",
    };
    /// Single electricity market on the island of Ireland. No single country
    /// code in the ENTSO-E list; callers fall back to description parsing.
    pub const IRELAND_SEM: AreaCode = AreaCode {
        code: "10Y1001A1001A59C",
        country_code: None,
        description: "Ireland SEM (IE)",
    };

    pub const ALL: &'static [AreaCode] = &[
        Self::GERMANY,
        Self::FRANCE,
        Self::NETHERLANDS,
        Self::DE_LU,
        Self::DE_AT_LU,
        Self::AUSTRIA,
        Self::BELGIUM,
        Self::SWITZERLAND,
        Self::SPAIN,
        Self::ITALY,
        Self::POLAND,
        Self::IRELAND_SEM,
    ];

    /// EIC code sent on the wire.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Short area name, when the code list defines one.
    pub fn country_code(&self) -> Option<&'static str> {
        self.country_code
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Name used as `area_code` in the store: the country code, or the EIC
    /// code for zones without one.
    pub fn area_name(&self) -> &'static str {
        self.country_code.unwrap_or(self.code)
    }

    /// Look up a zone by its short name (`DE`, `FR`, `DE-LU`, …).
    pub fn from_country_code(name: &str) -> Option<AreaCode> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.country_code == Some(name))
    }

    /// Look up a zone by its EIC code.
    pub fn from_eic(code: &str) -> Option<AreaCode> {
        Self::ALL.iter().copied().find(|a| a.code == code)
    }
}

impl fmt::Display for AreaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.area_name())
    }
}
