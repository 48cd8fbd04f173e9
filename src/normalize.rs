//! Vendor quirk fixes for raw hardware facts.
//!
//! Every function here is total: any input produces a value, so nothing in
//! this module can fail a run. The output is what the reconciler uses as
//! lookup and creation keys.

/// Serial numbers OEMs leave in firmware when nobody filled them in.
pub const PLACEHOLDER_SERIALS: &[&str] = &[
    "",
    "To be filled by O.E.M.",
    "System Serial Number",
    "Chassis Serial Number",
    "N/A",
];

const HEWLETT_PACKARD: &str = "Hewlett-Packard";
const LENOVO: &str = "Lenovo";
const DELL: &str = "Dell Inc.";

/// Collapse vendor name variants onto the name already used in the inventory.
pub fn normalize_manufacturer(raw: &str) -> String {
    match raw {
        HEWLETT_PACKARD => "HP".to_string(),
        other => other.to_string(),
    }
}

/// Returns `(model_number, model)`.
///
/// Lenovo reports the marketing name and the machine type in each other's
/// WMI properties, so the two are swapped for that vendor only.
pub fn normalize_model(manufacturer: &str, model: &str, model_number: &str) -> (String, String) {
    if manufacturer == LENOVO {
        return (model.to_string(), model_number.to_string());
    }
    (model_number.to_string(), model.to_string())
}

/// Produce the serial used as the asset identity key.
///
/// Dell BIOS serials may look like `CN12345/SERVICETAG`; the service tag after
/// the first `/` is the real serial. Placeholder or empty serials fall back to
/// the hostname so the key is never blank.
pub fn normalize_serial(manufacturer: &str, raw_serial: &str, hostname: &str) -> String {
    let serial = if manufacturer == DELL {
        match raw_serial.split_once('/') {
            Some((_, tag)) => tag,
            None => raw_serial,
        }
    } else {
        raw_serial
    };

    if is_placeholder_serial(serial) {
        log::debug!(
            "Serial '{}' is a placeholder, using hostname '{}' instead",
            serial,
            hostname
        );
        return hostname.to_string();
    }
    serial.to_string()
}

pub fn is_placeholder_serial(serial: &str) -> bool {
    PLACEHOLDER_SERIALS.contains(&serial.trim())
}

/// Format a probed number the way the inventory's custom fields expect it.
///
/// Integral values lose their fraction (`"512.0"` → `"512"`); others keep one
/// decimal with a comma separator (`"237.46"` → `"237,5"`). Input that is not
/// a number passes through unchanged.
pub fn format_number(raw: &str) -> String {
    let Ok(number) = raw.trim().replace(',', ".").parse::<f64>() else {
        return raw.to_string();
    };
    if !number.is_finite() {
        return raw.to_string();
    }
    if number.fract() == 0.0 {
        return format!("{}", number as i64);
    }
    format!("{:.1}", number).replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_manufacturer() {
        assert_eq!(normalize_manufacturer("Hewlett-Packard"), "HP");
        assert_eq!(normalize_manufacturer("Dell Inc."), "Dell Inc.");
        assert_eq!(normalize_manufacturer(""), "");
    }

    #[test]
    fn test_normalize_model_swaps_for_lenovo_only() {
        assert_eq!(
            normalize_model("Lenovo", "ThinkPad X1", "20ABC"),
            ("ThinkPad X1".to_string(), "20ABC".to_string())
        );
        assert_eq!(
            normalize_model("Dell Inc.", "ThinkPad X1", "20ABC"),
            ("20ABC".to_string(), "ThinkPad X1".to_string())
        );
        // Case-sensitive vendor match
        assert_eq!(
            normalize_model("LENOVO", "ThinkPad X1", "20ABC"),
            ("20ABC".to_string(), "ThinkPad X1".to_string())
        );
    }

    #[test]
    fn test_normalize_serial_dell_slash() {
        assert_eq!(normalize_serial("Dell Inc.", "CN12345/XYZ789", "HOST1"), "XYZ789");
        assert_eq!(normalize_serial("Dell Inc.", "NOSLASH", "HOST1"), "NOSLASH");
        // Only Dell gets the split
        assert_eq!(normalize_serial("HP", "CN12345/XYZ789", "HOST1"), "CN12345/XYZ789");
    }

    #[test]
    fn test_normalize_serial_placeholder_falls_back_to_hostname() {
        assert_eq!(normalize_serial("ASUS", "To be filled by O.E.M.", "HOST1"), "HOST1");
        assert_eq!(normalize_serial("Dell Inc.", "", "HOST1"), "HOST1");
        assert_eq!(normalize_serial("HP", "  N/A ", "HOST1"), "HOST1");
        assert_eq!(normalize_serial("Dell Inc.", "CN12345/", "HOST1"), "HOST1");
        assert_eq!(normalize_serial("HP", "5CG1234XYZ", "HOST1"), "5CG1234XYZ");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number("512"), "512");
        assert_eq!(format_number("512.0"), "512");
        assert_eq!(format_number("237.46"), "237,5");
        assert_eq!(format_number("15,6"), "15,6");
        assert_eq!(format_number("Intel Core i7"), "Intel Core i7");
        assert_eq!(format_number(""), "");
    }
}
