// ==========================================
// CRM ETL - country name/alias -> ISO2 table
// ==========================================
// Fixed lookup; the caller normalizes (strip + uppercase) before calling.
// Unresolvable names are a validation failure, never a guess.
// ==========================================

/// Resolve a normalized (stripped, uppercased) country name, alias, or code
/// to its ISO 3166-1 alpha-2 code.
pub fn resolve_iso2(normalized: &str) -> Option<&'static str> {
    let code = match normalized {
        // ===== Americas =====
        "US" | "USA" | "U.S." | "U.S.A." | "UNITED STATES" | "UNITED STATES OF AMERICA"
        | "AMERICA" => "US",
        "CA" | "CAN" | "CANADA" => "CA",
        "MX" | "MEX" | "MEXICO" => "MX",
        "BR" | "BRA" | "BRAZIL" => "BR",
        "AR" | "ARG" | "ARGENTINA" => "AR",
        "CL" | "CHL" | "CHILE" => "CL",
        "CO" | "COL" | "COLOMBIA" => "CO",
        "PE" | "PER" | "PERU" => "PE",

        // ===== Europe =====
        "GB" | "GBR" | "UK" | "UNITED KINGDOM" | "GREAT BRITAIN" | "ENGLAND" | "SCOTLAND"
        | "WALES" => "GB",
        "IE" | "IRL" | "IRELAND" => "IE",
        "FR" | "FRA" | "FRANCE" => "FR",
        "DE" | "DEU" | "GERMANY" => "DE",
        "ES" | "ESP" | "SPAIN" => "ES",
        "PT" | "PRT" | "PORTUGAL" => "PT",
        "IT" | "ITA" | "ITALY" => "IT",
        "NL" | "NLD" | "NETHERLANDS" | "HOLLAND" | "THE NETHERLANDS" => "NL",
        "BE" | "BEL" | "BELGIUM" => "BE",
        "LU" | "LUX" | "LUXEMBOURG" => "LU",
        "CH" | "CHE" | "SWITZERLAND" => "CH",
        "AT" | "AUT" | "AUSTRIA" => "AT",
        "SE" | "SWE" | "SWEDEN" => "SE",
        "NO" | "NOR" | "NORWAY" => "NO",
        "DK" | "DNK" | "DENMARK" => "DK",
        "FI" | "FIN" | "FINLAND" => "FI",
        "IS" | "ISL" | "ICELAND" => "IS",
        "PL" | "POL" | "POLAND" => "PL",
        "CZ" | "CZE" | "CZECH REPUBLIC" | "CZECHIA" => "CZ",
        "SK" | "SVK" | "SLOVAKIA" => "SK",
        "HU" | "HUN" | "HUNGARY" => "HU",
        "RO" | "ROU" | "ROMANIA" => "RO",
        "BG" | "BGR" | "BULGARIA" => "BG",
        "GR" | "GRC" | "GREECE" => "GR",
        "HR" | "HRV" | "CROATIA" => "HR",
        "SI" | "SVN" | "SLOVENIA" => "SI",
        "EE" | "EST" | "ESTONIA" => "EE",
        "LV" | "LVA" | "LATVIA" => "LV",
        "LT" | "LTU" | "LITHUANIA" => "LT",
        "UA" | "UKR" | "UKRAINE" => "UA",
        "RU" | "RUS" | "RUSSIA" | "RUSSIAN FEDERATION" => "RU",
        "TR" | "TUR" | "TURKEY" | "TURKIYE" => "TR",

        // ===== Middle East / Africa =====
        "IL" | "ISR" | "ISRAEL" => "IL",
        "AE" | "ARE" | "UNITED ARAB EMIRATES" | "UAE" => "AE",
        "SA" | "SAU" | "SAUDI ARABIA" => "SA",
        "QA" | "QAT" | "QATAR" => "QA",
        "EG" | "EGY" | "EGYPT" => "EG",
        "ZA" | "ZAF" | "SOUTH AFRICA" => "ZA",
        "NG" | "NGA" | "NIGERIA" => "NG",
        "KE" | "KEN" | "KENYA" => "KE",
        "MA" | "MAR" | "MOROCCO" => "MA",

        // ===== Asia / Pacific =====
        "CN" | "CHN" | "CHINA" | "PEOPLE'S REPUBLIC OF CHINA" => "CN",
        "JP" | "JPN" | "JAPAN" => "JP",
        "KR" | "KOR" | "SOUTH KOREA" | "KOREA" | "REPUBLIC OF KOREA" => "KR",
        "IN" | "IND" | "INDIA" => "IN",
        "PK" | "PAK" | "PAKISTAN" => "PK",
        "BD" | "BGD" | "BANGLADESH" => "BD",
        "SG" | "SGP" | "SINGAPORE" => "SG",
        "MY" | "MYS" | "MALAYSIA" => "MY",
        "TH" | "THA" | "THAILAND" => "TH",
        "VN" | "VNM" | "VIETNAM" | "VIET NAM" => "VN",
        "PH" | "PHL" | "PHILIPPINES" => "PH",
        "ID" | "IDN" | "INDONESIA" => "ID",
        "HK" | "HKG" | "HONG KONG" => "HK",
        "TW" | "TWN" | "TAIWAN" => "TW",
        "AU" | "AUS" | "AUSTRALIA" => "AU",
        "NZ" | "NZL" | "NEW ZEALAND" => "NZ",

        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_names_and_aliases() {
        assert_eq!(resolve_iso2("UNITED STATES"), Some("US"));
        assert_eq!(resolve_iso2("USA"), Some("US"));
        assert_eq!(resolve_iso2("US"), Some("US"));
        assert_eq!(resolve_iso2("UK"), Some("GB"));
        assert_eq!(resolve_iso2("UNITED KINGDOM"), Some("GB"));
        assert_eq!(resolve_iso2("FRANCE"), Some("FR"));
        assert_eq!(resolve_iso2("HOLLAND"), Some("NL"));
    }

    #[test]
    fn test_unknown_is_none() {
        assert_eq!(resolve_iso2("XYZ"), None);
        assert_eq!(resolve_iso2(""), None);
        assert_eq!(resolve_iso2("NEVERLAND"), None);
    }
}
