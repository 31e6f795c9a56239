/// Which bank routing identifier a jurisdiction prints by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingCode {
    /// International wire code (SWIFT/BIC)
    Wire,
    /// Domestic routing code such as IFSC
    Domestic,
}

/// Currency, number and tax-display conventions for one country code
#[derive(Debug, PartialEq)]
pub struct Jurisdiction {
    pub code: &'static str,
    pub aliases: &'static [&'static str],
    pub currency_symbol: &'static str,
    /// Used when the active font cannot draw `currency_symbol`
    pub fallback_symbol: &'static str,
    pub group_separator: char,
    pub decimal_separator: char,
    /// Whole amounts print without decimals
    pub drop_zero_decimals: bool,
    /// Tax line is hidden unless the record forces it
    pub hides_tax_by_default: bool,
    pub tax_label: &'static str,
    pub routing: RoutingCode,
    pub domestic_code_label: &'static str,
}

pub const INDIA: Jurisdiction = Jurisdiction {
    code: "india",
    aliases: &["in", "ind"],
    currency_symbol: "₹",
    fallback_symbol: "Rs.",
    group_separator: ',',
    decimal_separator: '.',
    drop_zero_decimals: false,
    hides_tax_by_default: false,
    tax_label: "Tax",
    routing: RoutingCode::Domestic,
    domestic_code_label: "IFSC Code",
};

pub const JAPAN: Jurisdiction = Jurisdiction {
    code: "japan",
    aliases: &["jp", "jpn"],
    currency_symbol: "JPY",
    fallback_symbol: "JPY",
    group_separator: ',',
    decimal_separator: '.',
    drop_zero_decimals: true,
    hides_tax_by_default: true,
    tax_label: "Consumption Tax",
    routing: RoutingCode::Wire,
    domestic_code_label: "IFSC Code",
};

static JURISDICTIONS: &[&Jurisdiction] = &[&INDIA, &JAPAN];

impl Jurisdiction {
    /// Look up a country code case-insensitively. Unknown or missing codes
    /// use the Indian conventions.
    pub fn lookup(code: Option<&str>) -> &'static Jurisdiction {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return &INDIA;
        };

        JURISDICTIONS
            .iter()
            .copied()
            .find(|j| {
                j.code.eq_ignore_ascii_case(code)
                    || j.aliases.iter().any(|a| a.eq_ignore_ascii_case(code))
            })
            .unwrap_or(&INDIA)
    }

    /// Whether the tax row is printed for this jurisdiction
    pub fn shows_tax(&self, forced: bool) -> bool {
        !self.hides_tax_by_default || forced
    }

    /// Whether a wire code is printed instead of the domestic routing code
    pub fn prefers_wire_code(&self, swift_present: bool) -> bool {
        self.routing == RoutingCode::Wire || swift_present
    }
}
