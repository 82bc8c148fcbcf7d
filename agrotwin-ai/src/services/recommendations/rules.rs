//! Advisory rule table
//!
//! Rules are evaluated in table order and each contributes at most one
//! [`Finding`]. Within a rule the first matching tier wins. Findings carry
//! an [`Advice`] code plus the values a renderer needs; wording lives in
//! the template table, not here.

use agrotwin_common::SoilFeatures;

use super::requirements::{requirement_for, Band, CropRequirement, Field};
use crate::models::{AnomalyAssessment, HealthRating, Priority, SoilHealthAssessment};

/// Advisory codes, one per template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Advice {
    MoistureCriticalLow,
    MoistureLow,
    MoistureWaterlogged,
    MoistureHigh,
    PhAcidicNutrientLockout,
    PhVeryAcidic,
    PhAcidic,
    PhVeryAlkaline,
    PhAlkaline,
    NitrogenSevere,
    NitrogenLow,
    NitrogenExcess,
    PhosphorusSevere,
    PhosphorusLow,
    PotassiumSevere,
    PotassiumLow,
    SoilTemperatureLow,
    SoilTemperatureHigh,
    SoilHealthPoor,
    SoilHealthFair,
    SensorAnomaly,
    SalinityHigh,
    SalinityElevated,
    Maintain,
}

impl Advice {
    pub const ALL: [Advice; 24] = [
        Advice::MoistureCriticalLow,
        Advice::MoistureLow,
        Advice::MoistureWaterlogged,
        Advice::MoistureHigh,
        Advice::PhAcidicNutrientLockout,
        Advice::PhVeryAcidic,
        Advice::PhAcidic,
        Advice::PhVeryAlkaline,
        Advice::PhAlkaline,
        Advice::NitrogenSevere,
        Advice::NitrogenLow,
        Advice::NitrogenExcess,
        Advice::PhosphorusSevere,
        Advice::PhosphorusLow,
        Advice::PotassiumSevere,
        Advice::PotassiumLow,
        Advice::SoilTemperatureLow,
        Advice::SoilTemperatureHigh,
        Advice::SoilHealthPoor,
        Advice::SoilHealthFair,
        Advice::SensorAnomaly,
        Advice::SalinityHigh,
        Advice::SalinityElevated,
        Advice::Maintain,
    ];

    /// Template key
    pub fn code(&self) -> &'static str {
        match self {
            Advice::MoistureCriticalLow => "moisture_critical_low",
            Advice::MoistureLow => "moisture_low",
            Advice::MoistureWaterlogged => "moisture_waterlogged",
            Advice::MoistureHigh => "moisture_high",
            Advice::PhAcidicNutrientLockout => "ph_acidic_nutrient_lockout",
            Advice::PhVeryAcidic => "ph_very_acidic",
            Advice::PhAcidic => "ph_acidic",
            Advice::PhVeryAlkaline => "ph_very_alkaline",
            Advice::PhAlkaline => "ph_alkaline",
            Advice::NitrogenSevere => "nitrogen_severe",
            Advice::NitrogenLow => "nitrogen_low",
            Advice::NitrogenExcess => "nitrogen_excess",
            Advice::PhosphorusSevere => "phosphorus_severe",
            Advice::PhosphorusLow => "phosphorus_low",
            Advice::PotassiumSevere => "potassium_severe",
            Advice::PotassiumLow => "potassium_low",
            Advice::SoilTemperatureLow => "soil_temperature_low",
            Advice::SoilTemperatureHigh => "soil_temperature_high",
            Advice::SoilHealthPoor => "soil_health_poor",
            Advice::SoilHealthFair => "soil_health_fair",
            Advice::SensorAnomaly => "sensor_anomaly",
            Advice::SalinityHigh => "salinity_high",
            Advice::SalinityElevated => "salinity_elevated",
            Advice::Maintain => "maintain",
        }
    }
}

/// Which side of the band a tier watches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Below,
    Above,
}

/// One severity step: fires when the value is beyond the band edge by more
/// than `margin`
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub side: Side,
    pub margin: f64,
    pub priority: Priority,
    pub advice: Advice,
}

impl Tier {
    const fn below(margin: f64, priority: Priority, advice: Advice) -> Self {
        Self { side: Side::Below, margin, priority, advice }
    }

    const fn above(margin: f64, priority: Priority, advice: Advice) -> Self {
        Self { side: Side::Above, margin, priority, advice }
    }

    pub fn matches(&self, value: f64, band: &Band) -> bool {
        match self.side {
            Side::Below => value < band.min - self.margin,
            Side::Above => value > band.max + self.margin,
        }
    }
}

/// Replaces a below-band finding with a single composite finding when any
/// of `nutrients` is also below its band minimum
#[derive(Debug, Clone, Copy)]
pub struct Escalation {
    pub nutrients: &'static [Field],
    pub priority: Priority,
    pub advice: Advice,
}

/// Salinity step on the conductivity/salt pair; either threshold suffices
#[derive(Debug, Clone, Copy)]
pub struct SalinityTier {
    pub conductivity_above: f64,
    pub salt_above: f64,
    pub priority: Priority,
    pub advice: Advice,
}

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Band {
        field: Field,
        tiers: &'static [Tier],
        escalation: Option<Escalation>,
    },
    SoilHealth,
    Anomaly,
    Salinity(&'static [SalinityTier]),
}

/// Evaluation order is part of the output contract: consumers read the list
/// most domain-urgent first
pub const RULES: &[Rule] = &[
    Rule::Band {
        field: Field::SoilMoisture,
        tiers: &[
            Tier::below(15.0, Priority::Critical, Advice::MoistureCriticalLow),
            Tier::below(0.0, Priority::High, Advice::MoistureLow),
            Tier::above(10.0, Priority::High, Advice::MoistureWaterlogged),
            Tier::above(0.0, Priority::Medium, Advice::MoistureHigh),
        ],
        escalation: None,
    },
    Rule::Band {
        field: Field::Ph,
        tiers: &[
            Tier::below(0.5, Priority::High, Advice::PhVeryAcidic),
            Tier::below(0.0, Priority::Medium, Advice::PhAcidic),
            Tier::above(0.5, Priority::High, Advice::PhVeryAlkaline),
            Tier::above(0.0, Priority::Medium, Advice::PhAlkaline),
        ],
        escalation: Some(Escalation {
            nutrients: &[Field::Nitrogen, Field::Phosphorus],
            priority: Priority::Critical,
            advice: Advice::PhAcidicNutrientLockout,
        }),
    },
    Rule::Band {
        field: Field::Nitrogen,
        tiers: &[
            Tier::below(15.0, Priority::Critical, Advice::NitrogenSevere),
            Tier::below(0.0, Priority::High, Advice::NitrogenLow),
            Tier::above(0.0, Priority::Low, Advice::NitrogenExcess),
        ],
        escalation: None,
    },
    Rule::Band {
        field: Field::Phosphorus,
        tiers: &[
            Tier::below(10.0, Priority::High, Advice::PhosphorusSevere),
            Tier::below(0.0, Priority::Medium, Advice::PhosphorusLow),
        ],
        escalation: None,
    },
    Rule::Band {
        field: Field::Potassium,
        tiers: &[
            Tier::below(50.0, Priority::High, Advice::PotassiumSevere),
            Tier::below(0.0, Priority::Medium, Advice::PotassiumLow),
        ],
        escalation: None,
    },
    Rule::Band {
        field: Field::SoilTemperature,
        tiers: &[
            Tier::below(0.0, Priority::Medium, Advice::SoilTemperatureLow),
            Tier::above(0.0, Priority::Medium, Advice::SoilTemperatureHigh),
        ],
        escalation: None,
    },
    Rule::SoilHealth,
    Rule::Anomaly,
    // Conductivity in µS/cm, salt in mg/L
    Rule::Salinity(&[
        SalinityTier {
            conductivity_above: 2500.0,
            salt_above: 1200.0,
            priority: Priority::High,
            advice: Advice::SalinityHigh,
        },
        SalinityTier {
            conductivity_above: 2000.0,
            salt_above: 1000.0,
            priority: Priority::Medium,
            advice: Advice::SalinityElevated,
        },
    ]),
];

/// Values a template may reference
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdviceArgs {
    pub crop: String,
    pub value: Option<f64>,
    pub decimals: usize,
    pub band: Option<Band>,
    pub conductivity: Option<f64>,
    pub salt: Option<f64>,
    pub score: Option<f64>,
    pub nutrients: Vec<&'static str>,
}

/// A fired rule, before rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub priority: Priority,
    pub advice: Advice,
    pub args: AdviceArgs,
}

/// Everything the rules look at
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub features: &'a SoilFeatures,
    pub crop: &'a str,
    pub soil_health: &'a SoilHealthAssessment,
    pub anomaly: &'a AnomalyAssessment,
}

/// Evaluate [`RULES`] in order; never empty
pub fn evaluate(input: &RuleInput<'_>) -> Vec<Finding> {
    let requirement = requirement_for(input.crop);
    let mut findings: Vec<Finding> = RULES
        .iter()
        .filter_map(|rule| evaluate_rule(rule, input, requirement))
        .collect();

    if findings.is_empty() {
        findings.push(Finding {
            priority: Priority::Low,
            advice: Advice::Maintain,
            args: AdviceArgs {
                crop: input.crop.to_string(),
                ..AdviceArgs::default()
            },
        });
    }
    findings
}

fn evaluate_rule(
    rule: &Rule,
    input: &RuleInput<'_>,
    requirement: &CropRequirement,
) -> Option<Finding> {
    let crop = input.crop.to_string();
    match rule {
        Rule::Band {
            field,
            tiers,
            escalation,
        } => {
            let band = field.band(requirement)?;
            let value = field.value(input.features);
            let tier = tiers.iter().find(|t| t.matches(value, &band))?;

            let mut finding = Finding {
                priority: tier.priority,
                advice: tier.advice,
                args: AdviceArgs {
                    crop,
                    value: Some(value),
                    decimals: field.decimals(),
                    band: Some(band),
                    ..AdviceArgs::default()
                },
            };

            if let Some(escalation) = escalation {
                let deficient = deficient_nutrients(escalation.nutrients, input.features, requirement);
                if tier.side == Side::Below && !deficient.is_empty() {
                    finding.priority = escalation.priority;
                    finding.advice = escalation.advice;
                    finding.args.nutrients = deficient;
                }
            }
            Some(finding)
        }
        Rule::SoilHealth => {
            let (priority, advice) = match input.soil_health.rating {
                HealthRating::Poor => (Priority::High, Advice::SoilHealthPoor),
                HealthRating::Fair => (Priority::Medium, Advice::SoilHealthFair),
                HealthRating::Good | HealthRating::Excellent => return None,
            };
            Some(Finding {
                priority,
                advice,
                args: AdviceArgs {
                    crop,
                    score: Some(input.soil_health.overall_score),
                    ..AdviceArgs::default()
                },
            })
        }
        Rule::Anomaly => input.anomaly.is_anomaly.then(|| Finding {
            priority: Priority::High,
            advice: Advice::SensorAnomaly,
            args: AdviceArgs {
                crop,
                value: Some(input.anomaly.anomaly_score),
                decimals: 3,
                ..AdviceArgs::default()
            },
        }),
        Rule::Salinity(tiers) => {
            let conductivity = input.features.conductivity;
            let salt = input.features.salt;
            let tier = tiers
                .iter()
                .find(|t| conductivity > t.conductivity_above || salt > t.salt_above)?;
            Some(Finding {
                priority: tier.priority,
                advice: tier.advice,
                args: AdviceArgs {
                    crop,
                    conductivity: Some(conductivity),
                    salt: Some(salt),
                    ..AdviceArgs::default()
                },
            })
        }
    }
}

fn deficient_nutrients(
    nutrients: &[Field],
    features: &SoilFeatures,
    requirement: &CropRequirement,
) -> Vec<&'static str> {
    nutrients
        .iter()
        .filter(|field| {
            field
                .band(requirement)
                .map_or(false, |band| field.value(features) < band.min)
        })
        .map(|field| field.name())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inside every coffee band, clean salinity
    fn coffee_ok() -> SoilFeatures {
        SoilFeatures {
            soil_temperature: 23.0,
            soil_moisture: 65.0,
            conductivity: 1200.0,
            ph: 6.0,
            nitrogen: 50.0,
            phosphorus: 40.0,
            potassium: 250.0,
            salt: 600.0,
            air_temperature: 26.0,
            air_humidity: 70.0,
            is_raining: false,
        }
    }

    fn run(features: &SoilFeatures, crop: &str, rating_score: f64, anomaly: bool) -> Vec<Finding> {
        let soil_health = SoilHealthAssessment::from_raw(rating_score);
        let anomaly = AnomalyAssessment::new(anomaly, if anomaly { -4.2 } else { -0.3 });
        evaluate(&RuleInput {
            features,
            crop,
            soil_health: &soil_health,
            anomaly: &anomaly,
        })
    }

    fn advice(findings: &[Finding]) -> Vec<(Priority, Advice)> {
        findings.iter().map(|f| (f.priority, f.advice)).collect()
    }

    #[test]
    fn test_all_in_band_yields_single_maintain() {
        for score in [72.0, 91.0] {
            let findings = run(&coffee_ok(), "coffee", score, false);
            assert_eq!(advice(&findings), vec![(Priority::Low, Advice::Maintain)]);
            assert_eq!(findings[0].args.crop, "coffee");
        }
    }

    #[test]
    fn test_coffee_very_dry_is_critical() {
        let features = SoilFeatures {
            soil_moisture: 20.0,
            ..coffee_ok()
        };
        let findings = run(&features, "coffee", 80.0, false);
        assert_eq!(
            advice(&findings),
            vec![(Priority::Critical, Advice::MoistureCriticalLow)]
        );
        assert_eq!(findings[0].args.value, Some(20.0));
    }

    #[test]
    fn test_moisture_tiers_are_strict() {
        // coffee band 55-75
        let cases = [
            (39.9, Some((Priority::Critical, Advice::MoistureCriticalLow))),
            (40.0, Some((Priority::High, Advice::MoistureLow))),
            (54.9, Some((Priority::High, Advice::MoistureLow))),
            (55.0, None),
            (75.0, None),
            (75.1, Some((Priority::Medium, Advice::MoistureHigh))),
            (85.0, Some((Priority::Medium, Advice::MoistureHigh))),
            (85.1, Some((Priority::High, Advice::MoistureWaterlogged))),
        ];
        for (moisture, expected) in cases {
            let features = SoilFeatures {
                soil_moisture: moisture,
                ..coffee_ok()
            };
            let found = run(&features, "coffee", 80.0, false)
                .into_iter()
                .find(|f| f.advice.code().starts_with("moisture"))
                .map(|f| (f.priority, f.advice));
            assert_eq!(found, expected, "moisture {}", moisture);
        }
    }

    #[test]
    fn test_acidic_with_low_nitrogen_is_single_composite() {
        let features = SoilFeatures {
            ph: 5.0,
            nitrogen: 20.0,
            ..coffee_ok()
        };
        let findings = run(&features, "coffee", 80.0, false);

        let ph: Vec<_> = findings
            .iter()
            .filter(|f| {
                matches!(
                    f.advice,
                    Advice::PhAcidicNutrientLockout | Advice::PhAcidic | Advice::PhVeryAcidic
                )
            })
            .collect();
        assert_eq!(ph.len(), 1);
        assert_eq!(ph[0].priority, Priority::Critical);
        assert_eq!(ph[0].advice, Advice::PhAcidicNutrientLockout);
        assert_eq!(ph[0].args.nutrients, vec!["nitrogen"]);

        // Composite comes first, nutrient rule still reports afterwards
        assert_eq!(findings[0].advice, Advice::PhAcidicNutrientLockout);
        assert_eq!(findings[1].advice, Advice::NitrogenLow);
        assert!(!findings.iter().any(|f| f.priority == Priority::Medium));
    }

    #[test]
    fn test_acidic_with_good_nutrients_is_not_escalated() {
        let features = SoilFeatures {
            ph: 5.3,
            ..coffee_ok()
        };
        assert_eq!(
            advice(&run(&features, "coffee", 80.0, false)),
            vec![(Priority::Medium, Advice::PhAcidic)]
        );

        let features = SoilFeatures {
            ph: 4.8,
            ..coffee_ok()
        };
        assert_eq!(
            advice(&run(&features, "coffee", 80.0, false)),
            vec![(Priority::High, Advice::PhVeryAcidic)]
        );
    }

    #[test]
    fn test_alkaline_is_never_escalated() {
        let features = SoilFeatures {
            ph: 7.2,
            nitrogen: 10.0,
            ..coffee_ok()
        };
        let findings = advice(&run(&features, "coffee", 80.0, false));
        assert_eq!(findings[0], (Priority::High, Advice::PhVeryAlkaline));
        assert_eq!(findings[1], (Priority::Critical, Advice::NitrogenSevere));
    }

    #[test]
    fn test_nutrient_tiers() {
        let features = SoilFeatures {
            nitrogen: 90.0,
            phosphorus: 14.0,
            potassium: 150.0,
            ..coffee_ok()
        };
        assert_eq!(
            advice(&run(&features, "coffee", 80.0, false)),
            vec![
                (Priority::Low, Advice::NitrogenExcess),
                (Priority::High, Advice::PhosphorusSevere),
                (Priority::Medium, Advice::PotassiumLow),
            ]
        );
    }

    #[test]
    fn test_temperature_only_for_crops_with_band() {
        let features = SoilFeatures {
            soil_temperature: 31.0,
            ..coffee_ok()
        };
        assert_eq!(
            advice(&run(&features, "coffee", 80.0, false)),
            vec![(Priority::Medium, Advice::SoilTemperatureHigh)]
        );

        // Same reading against the default table has no temperature band
        let findings = run(&features, "durian", 80.0, false);
        assert!(!findings.iter().any(|f| f.advice == Advice::SoilTemperatureHigh));
    }

    #[test]
    fn test_health_anomaly_salinity_order() {
        let features = SoilFeatures {
            conductivity: 2600.0,
            ..coffee_ok()
        };
        let findings = run(&features, "coffee", 40.0, true);
        assert_eq!(
            advice(&findings),
            vec![
                (Priority::High, Advice::SoilHealthPoor),
                (Priority::High, Advice::SensorAnomaly),
                (Priority::High, Advice::SalinityHigh),
            ]
        );
        assert_eq!(findings[0].args.score, Some(40.0));
        assert_eq!(findings[2].args.conductivity, Some(2600.0));
    }

    #[test]
    fn test_salinity_tiers() {
        let check = |conductivity: f64, salt: f64| {
            let features = SoilFeatures {
                conductivity,
                salt,
                ..coffee_ok()
            };
            run(&features, "coffee", 80.0, false)[0].advice
        };
        assert_eq!(check(2000.0, 1000.0), Advice::Maintain);
        assert_eq!(check(2001.0, 500.0), Advice::SalinityElevated);
        assert_eq!(check(1500.0, 1001.0), Advice::SalinityElevated);
        assert_eq!(check(1500.0, 1201.0), Advice::SalinityHigh);
        assert_eq!(check(2501.0, 100.0), Advice::SalinityHigh);
    }

    #[test]
    fn test_fair_rating_is_medium() {
        let findings = run(&coffee_ok(), "coffee", 60.0, false);
        assert_eq!(advice(&findings), vec![(Priority::Medium, Advice::SoilHealthFair)]);
    }

    #[test]
    fn test_advice_codes_unique() {
        let mut codes: Vec<_> = Advice::ALL.iter().map(|a| a.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Advice::ALL.len());
    }
}
