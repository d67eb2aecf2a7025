//! Tests for leaf quality scoring
//! Verifies the surface rules, severity, confidence tiers and classifier fusion

use proptest::prelude::*;
use shared::{
    analyze_surface, center_crop_bounds, confidence_level, fuse, rgb_to_hsv, rule_grade,
    severity, ClassifierOutput, ConfidenceLevel, DecisionSource, LeafGrade, ScoringConfig,
    Severity, SurfaceAnalysis, SurfaceColorTable, SURFACE_DETECTED_DISEASE,
};

fn config() -> ScoringConfig {
    ScoringConfig::default()
}

fn surface(green: f64, yellow: f64, brown: f64, dark: f64) -> SurfaceAnalysis {
    SurfaceAnalysis::new(green, yellow, brown, dark)
}

// =============================================================================
// Rule grade
// =============================================================================

mod rule_grading {
    use super::*;

    #[test]
    fn brown_or_dark_is_diseased() {
        assert_eq!(rule_grade(&surface(0.7, 0.0, 0.09, 0.0), &config()), LeafGrade::Diseased);
        assert_eq!(rule_grade(&surface(0.7, 0.0, 0.0, 0.06), &config()), LeafGrade::Diseased);
    }

    #[test]
    fn yellow_is_stressed() {
        assert_eq!(rule_grade(&surface(0.7, 0.16, 0.0, 0.0), &config()), LeafGrade::Stressed);
    }

    #[test]
    fn mostly_green_is_healthy() {
        assert_eq!(rule_grade(&surface(0.7, 0.05, 0.02, 0.01), &config()), LeafGrade::Healthy);
    }

    #[test]
    fn thresholds_are_strict() {
        // Exactly at the diseased threshold and nothing green
        assert_eq!(rule_grade(&surface(0.0, 0.0, 0.08, 0.0), &config()), LeafGrade::Uncertain);
        assert_eq!(rule_grade(&surface(0.6, 0.0, 0.0, 0.0), &config()), LeafGrade::Uncertain);
    }

    #[test]
    fn disease_wins_over_stress() {
        assert_eq!(rule_grade(&surface(0.3, 0.3, 0.1, 0.0), &config()), LeafGrade::Diseased);
    }
}

// =============================================================================
// Severity and confidence
// =============================================================================

mod severity_and_confidence {
    use super::*;

    #[test]
    fn severity_levels() {
        assert_eq!(severity(&surface(0.5, 0.0, 0.16, 0.0), &config()), Severity::High);
        assert_eq!(severity(&surface(0.5, 0.0, 0.0, 0.11), &config()), Severity::High);
        assert_eq!(severity(&surface(0.5, 0.0, 0.09, 0.0), &config()), Severity::Moderate);
        assert_eq!(severity(&surface(0.5, 0.21, 0.0, 0.0), &config()), Severity::Moderate);
        assert_eq!(severity(&surface(0.9, 0.05, 0.02, 0.0), &config()), Severity::Low);
    }

    #[test]
    fn confidence_tiers() {
        let tiers = &config().confidence;
        assert_eq!(confidence_level(90, tiers), ConfidenceLevel::High);
        assert_eq!(confidence_level(89, tiers), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(75, tiers), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(74, tiers), ConfidenceLevel::Low);
    }

    #[test]
    fn probability_truncated_to_percent() {
        assert_eq!(ClassifierOutput::from_probability("Healthy", 0.919).confidence_pct, 91);
        assert_eq!(ClassifierOutput::new("Healthy", 150).confidence_pct, 100);
    }
}

// =============================================================================
// Fusion
// =============================================================================

mod fusion {
    use super::*;

    #[test]
    fn classifier_disease_is_final() {
        let output = ClassifierOutput::new("Blister Blight", 93);
        let decision = fuse(Some(&output), &surface(0.9, 0.0, 0.0, 0.0), &config());
        assert_eq!(decision.final_grade, LeafGrade::Diseased);
        assert_eq!(decision.rule_grade, LeafGrade::Healthy);
        assert_eq!(decision.disease_type.as_deref(), Some("Blister Blight"));
        assert_eq!(decision.decision_source, DecisionSource::Cnn);
        assert_eq!(decision.confidence_level, ConfidenceLevel::High);
    }

    #[test]
    fn healthy_classifier_defers_to_surface() {
        let output = ClassifierOutput::new("Healthy", 80);
        let decision = fuse(Some(&output), &surface(0.5, 0.0, 0.12, 0.0), &config());
        assert_eq!(decision.final_grade, LeafGrade::Diseased);
        assert_eq!(decision.disease_type.as_deref(), Some(SURFACE_DETECTED_DISEASE));
        assert_eq!(decision.decision_source, DecisionSource::RuleBased);
        assert_eq!(decision.cnn_prediction.as_deref(), Some("Healthy"));
    }

    #[test]
    fn healthy_everywhere_has_no_disease() {
        let output = ClassifierOutput::new("healthy", 97);
        let decision = fuse(Some(&output), &surface(0.9, 0.02, 0.01, 0.0), &config());
        assert_eq!(decision.final_grade, LeafGrade::Healthy);
        assert!(decision.disease_type.is_none());
    }

    #[test]
    fn without_classifier_confidence_is_zero() {
        let decision = fuse(None, &surface(0.9, 0.02, 0.01, 0.0), &config());
        assert_eq!(decision.confidence_pct, 0);
        assert_eq!(decision.confidence_level, ConfidenceLevel::Low);
        assert!(decision.cnn_prediction.is_none());
        assert_eq!(decision.confidence_fraction(), 0.0);
    }
}

// =============================================================================
// Surface analysis
// =============================================================================

mod surface_analysis {
    use super::*;

    const GREEN: [u8; 3] = [0, 200, 0];
    const BROWN: [u8; 3] = [140, 80, 30];
    const BLACK: [u8; 3] = [0, 0, 0];

    #[test]
    fn hsv_on_opencv_scale() {
        assert_eq!(rgb_to_hsv(GREEN), [60, 255, 200]);
        assert_eq!(rgb_to_hsv(BLACK), [0, 0, 0]);
    }

    #[test]
    fn fractions_of_mixed_pixels() {
        let pixels = vec![GREEN, GREEN, GREEN, BLACK];
        let result = analyze_surface(pixels, &SurfaceColorTable::default());
        assert_eq!(result.green, 0.75);
        assert_eq!(result.dark, 0.25);
        assert_eq!(result.yellow, 0.0);
    }

    #[test]
    fn brown_share_rounded_across_threshold() {
        // 4050 of a 224x224 crop is 0.0807
        let mut pixels = vec![BROWN; 4050];
        pixels.extend(vec![GREEN; 224 * 224 - 4050]);
        let result = analyze_surface(pixels, &SurfaceColorTable::default());
        assert_eq!(result.brown, 0.081);
        assert_eq!(rule_grade(&result, &config()), LeafGrade::Diseased);
    }

    #[test]
    fn hue_just_below_red_wraps_to_zero() {
        assert_eq!(rgb_to_hsv([255, 0, 2]), [0, 255, 255]);
    }

    #[test]
    fn empty_image_is_all_zero() {
        let result = analyze_surface(Vec::<[u8; 3]>::new(), &SurfaceColorTable::default());
        assert_eq!(result, SurfaceAnalysis::default());
    }

    #[test]
    fn center_crop_keeps_middle() {
        assert_eq!(center_crop_bounds(100, 100), (10, 10, 80, 80));
        let (_, _, w, h) = center_crop_bounds(1, 1);
        assert!(w >= 1 && h >= 1);
    }
}

// =============================================================================
// Properties
// =============================================================================

mod properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn fractions_never_exceed_one(pixels in prop::collection::vec(any::<[u8; 3]>(), 1..200)) {
            let result = analyze_surface(pixels, &SurfaceColorTable::default());
            prop_assert!(result.total() <= 1.0 + 1e-9);
        }

        #[test]
        fn named_disease_always_diseased(
            green in 0.0..0.25f64,
            yellow in 0.0..0.25f64,
            brown in 0.0..0.25f64,
            dark in 0.0..0.25f64,
            pct in 0u8..=100,
        ) {
            let output = ClassifierOutput::new("Red Rust", pct);
            let decision = fuse(Some(&output), &surface(green, yellow, brown, dark), &config());
            prop_assert_eq!(decision.final_grade, LeafGrade::Diseased);
            prop_assert_eq!(decision.decision_source, DecisionSource::Cnn);
        }
    }
}
