//! Option bundles for each processing step.
//!
//! Values follow the GMOS longslit cookbook reduction of the AM2306-72
//! field; callers layer run-specific options (MasterCal references, sky
//! samples, arc databases) on top with [`StageOptions::with`].

use super::options::StageOptions;

/// `gbias`: combine bias frames.
pub fn bias(raw_path: &str) -> StageOptions {
    StageOptions::new()
        .with("logfile", "biasLog.txt")
        .with("rawpath", raw_path)
        .with("fl_vardq", true)
        .with("verbose", false)
}

/// `gsflat`: normalised spectral flat.
pub fn flat(raw_path: &str) -> StageOptions {
    StageOptions::new()
        .with("fl_over", true)
        .with("fl_trim", true)
        .with("fl_bias", true)
        .with("fl_dark", false)
        .with("fl_fixpix", false)
        .with("fl_oversize", false)
        .with("fl_vardq", true)
        .with("fl_fulldq", true)
        .with("rawpath", raw_path)
        .with("fl_inter", false)
        .with("fl_detec", true)
        .with("function", "spline3")
        .with("order", "13,11,28")
        .with("logfile", "gsflatLog.txt")
        .with("verbose", false)
}

/// `gsreduce` for science exposures.
pub fn science_reduce(raw_path: &str) -> StageOptions {
    StageOptions::new()
        .with("fl_over", true)
        .with("fl_trim", true)
        .with("fl_bias", true)
        .with("fl_gscrrej", false)
        .with("fl_dark", false)
        .with("fl_flat", true)
        .with("fl_gmosaic", true)
        .with("fl_fixpix", false)
        .with("fl_gsappwave", true)
        .with("fl_oversize", false)
        .with("fl_vardq", true)
        .with("fl_fulldq", true)
        .with("rawpath", raw_path)
        .with("fl_inter", false)
        .with("logfile", "gsreduceLog.txt")
        .with("verbose", false)
}

/// `gsreduce` for arcs: no flat-fielding, no variance planes.
pub fn arc_reduce(raw_path: &str) -> StageOptions {
    science_reduce(raw_path)
        .with("fl_flat", false)
        .with("fl_vardq", false)
        .with("fl_fulldq", false)
}

/// `gsreduce` for the standard star.
pub fn standard_reduce(raw_path: &str) -> StageOptions {
    science_reduce(raw_path)
        .with("fl_fixpix", true)
        .with("fl_vardq", false)
        .with("fl_fulldq", false)
}

/// `gswavelength`: CuAr line list, non-interactive fit.
pub fn wavelength() -> StageOptions {
    StageOptions::new()
        .with("coordlist", "gmos$data/CuAr_GMOS.dat")
        .with("fwidth", 6i64)
        .with("nsum", 50i64)
        .with("function", "chebyshev")
        .with("order", 5i64)
        .with("fl_inter", false)
        .with("logfile", "gswaveLog.txt")
        .with("verbose", false)
}

/// `gemcombine` for science exposures.
pub fn science_combine() -> StageOptions {
    StageOptions::new()
        .with("combine", "average")
        .with("reject", "ccdclip")
        .with("fl_vardq", true)
        .with("fl_dqprop", true)
        // Doubled extension matches the historical reduction logs.
        .with("logfile", "gemcombineLog.txt.txt")
        .with("verbose", false)
}

/// `gemcombine` for the standard star.
pub fn standard_combine() -> StageOptions {
    science_combine()
        .with("fl_vardq", false)
        .with("fl_dqprop", false)
}

/// `gstransform`.
pub fn transform() -> StageOptions {
    StageOptions::new()
        .with("fl_vardq", true)
        .with("interptype", "linear")
        .with("fl_flux", true)
        .with("logfile", "gstransLog.txt")
}

/// `gsskysub`.
pub fn sky() -> StageOptions {
    StageOptions::new()
        .with("fl_oversize", false)
        .with("fl_vardq", true)
        .with("logfile", "gsskysubLog.txt")
}

/// `gsextract`: traced extraction with fitted background.
pub fn extract() -> StageOptions {
    StageOptions::new()
        .with("apwidth", 3.0)
        .with("fl_inter", false)
        .with("find", true)
        .with("trace", true)
        .with("tfunction", "chebyshev")
        .with("torder", "6")
        .with("tnsum", 20i64)
        .with("background", "fit")
        .with("bfunction", "chebyshev")
        .with("border", 2i64)
        .with("fl_vardq", false)
        .with("logfile", "gsextrLog.txt")
}

/// `gsstandard`: sensitivity from the named standard star.
pub fn sensitivity(star_name: &str) -> StageOptions {
    StageOptions::new()
        .with("fl_inter", true)
        .with("starname", star_name)
        .with("caldir", "onedstds$ctionewcal/")
        .with("observatory", "Gemini-South")
        .with("extinction", "onedstds$ctioextinct.dat")
        .with("function", "chebyshev")
        .with("order", 9i64)
        .with("verbose", false)
        .with("logfile", "gsstdLog.txt")
        .with("sfile", "std.txt")
        .with("sfunction", super::ledger::SENSITIVITY)
}

/// `gscalibrate`; `sfunction` is set by the caller to the sensitivity artifact.
pub fn calibrate() -> StageOptions {
    StageOptions::new()
        .with("extinction", "onedstds$ctioextinct.dat")
        .with("fl_ext", true)
        .with("fl_scale", false)
        .with("fl_vardq", true)
        .with("logfile", "gscalibrateLog.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::options::OptionValue;
    use crate::stage::StageKind;

    #[test]
    fn test_bundles_use_recognized_keys() {
        let bundles = [
            (StageKind::Gbias, bias("./raw/")),
            (StageKind::Gsflat, flat("./raw/")),
            (StageKind::Gsreduce, science_reduce("./raw/")),
            (StageKind::Gsreduce, arc_reduce("./raw/")),
            (StageKind::Gsreduce, standard_reduce("./raw/")),
            (StageKind::Gswavelength, wavelength()),
            (StageKind::Gemcombine, science_combine()),
            (StageKind::Gemcombine, standard_combine()),
            (StageKind::Gstransform, transform()),
            (StageKind::Gsskysub, sky()),
            (StageKind::Gsextract, extract()),
            (StageKind::Gsstandard, sensitivity("l9239")),
            (StageKind::Gscalibrate, calibrate()),
        ];

        for (kind, options) in bundles {
            assert!(options.validate(kind).is_ok(), "{} bundle", kind);
        }
    }

    #[test]
    fn test_arc_reduce_disables_flat() {
        let arc = arc_reduce("./raw/");
        assert_eq!(arc.get("fl_flat"), Some(&OptionValue::Bool(false)));
        assert_eq!(arc.get("fl_gsappwave"), Some(&OptionValue::Bool(true)));

        let std = standard_reduce("./raw/");
        assert_eq!(std.get("fl_fixpix"), Some(&OptionValue::Bool(true)));
        assert_eq!(std.get("fl_flat"), Some(&OptionValue::Bool(true)));
    }

    #[test]
    fn test_extract_trace_order_is_text() {
        assert_eq!(
            extract().get("torder"),
            Some(&OptionValue::Text("6".to_string()))
        );
    }
}
