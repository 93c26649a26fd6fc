//! Field-accessor naming for prognostic fields and their tendencies.

/// Velocity component names in storage order.
pub const VELOCITIES: [&str; 3] = ["u", "v", "w"];

/// Accessor name of the current tendency `Gⁿ` of `field`.
pub fn tendency_name(field: &str) -> String {
    format!("G_{field}")
}

/// Accessor name of the previous-step tendency `G⁻` of `field`.
pub fn previous_tendency_name(field: &str) -> String {
    format!("G_{field}_prev")
}

/// Returns `true` if `name` is usable as a tracer name.
///
/// Tracer names must be non-empty, must not shadow a velocity or a
/// tendency accessor, and must not contain the archive path separator.
pub fn is_valid_tracer_name(name: &str) -> bool {
    !name.is_empty() && !VELOCITIES.contains(&name) && !name.starts_with("G_") && !name.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tendency_names() {
        assert_eq!(tendency_name("T"), "G_T");
        assert_eq!(previous_tendency_name("u"), "G_u_prev");
    }

    #[test]
    fn tracer_name_rules() {
        assert!(is_valid_tracer_name("T"));
        assert!(is_valid_tracer_name("salinity"));
        assert!(!is_valid_tracer_name(""));
        assert!(!is_valid_tracer_name("w"));
        assert!(!is_valid_tracer_name("G_T"));
        assert!(!is_valid_tracer_name("a/b"));
    }
}
