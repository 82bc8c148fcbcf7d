//! Per-crop agronomic requirement bands

use agrotwin_common::SoilFeatures;

/// Acceptable range for one measurement, with the agronomic reason behind it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
    pub rationale: &'static str,
}

impl Band {
    const fn new(min: f64, max: f64, rationale: &'static str) -> Self {
        Self { min, max, rationale }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CropRequirement {
    pub crop: &'static str,
    pub soil_moisture: Band,
    pub ph: Band,
    pub nitrogen: Band,
    pub phosphorus: Band,
    pub potassium: Band,
    /// Only temperature-sensitive crops define this band
    pub soil_temperature: Option<Band>,
}

pub const DEFAULT_REQUIREMENT: CropRequirement = CropRequirement {
    crop: "default",
    soil_moisture: Band::new(55.0, 75.0, "Most crops need moderate moisture"),
    ph: Band::new(6.0, 7.0, "Most crops prefer neutral pH"),
    nitrogen: Band::new(40.0, 80.0, "Standard N requirement"),
    phosphorus: Band::new(25.0, 60.0, "Standard P requirement"),
    potassium: Band::new(180.0, 300.0, "Standard K requirement"),
    soil_temperature: None,
};

pub const CROP_REQUIREMENTS: &[CropRequirement] = &[
    CropRequirement {
        crop: "rice",
        soil_moisture: Band::new(70.0, 90.0, "Rice requires flooded conditions during vegetative stage"),
        ph: Band::new(5.5, 7.0, "Rice prefers slightly acidic to neutral soil"),
        nitrogen: Band::new(40.0, 100.0, "High N requirement for grain development"),
        phosphorus: Band::new(20.0, 50.0, "Moderate P for root development"),
        potassium: Band::new(150.0, 300.0, "High K for disease resistance"),
        soil_temperature: None,
    },
    CropRequirement {
        crop: "coffee",
        soil_moisture: Band::new(55.0, 75.0, "Coffee needs consistent moisture but good drainage"),
        ph: Band::new(5.5, 6.5, "Coffee thrives in slightly acidic soil"),
        nitrogen: Band::new(35.0, 80.0, "Moderate N for leaf and berry development"),
        phosphorus: Band::new(25.0, 60.0, "P important for flowering and fruiting"),
        potassium: Band::new(180.0, 350.0, "High K for bean quality"),
        soil_temperature: Some(Band::new(18.0, 28.0, "Coffee requires moderate soil temperature")),
    },
    CropRequirement {
        crop: "maize",
        soil_moisture: Band::new(60.0, 80.0, "Maize needs adequate moisture during tasseling"),
        ph: Band::new(5.8, 7.0, "Maize prefers slightly acidic to neutral soil"),
        nitrogen: Band::new(50.0, 120.0, "Very high N requirement for biomass"),
        phosphorus: Band::new(30.0, 70.0, "High P for root and kernel development"),
        potassium: Band::new(200.0, 400.0, "High K for stalk strength"),
        soil_temperature: None,
    },
    CropRequirement {
        crop: "cotton",
        soil_moisture: Band::new(50.0, 70.0, "Cotton prefers moderate moisture"),
        ph: Band::new(6.0, 7.5, "Cotton tolerates slightly alkaline soil"),
        nitrogen: Band::new(40.0, 90.0, "Moderate N for fiber quality"),
        phosphorus: Band::new(25.0, 60.0, "Moderate P for flowering"),
        potassium: Band::new(180.0, 350.0, "High K for boll development"),
        soil_temperature: None,
    },
];

/// Requirement row for `crop`, falling back to [`DEFAULT_REQUIREMENT`]
pub fn requirement_for(crop: &str) -> &'static CropRequirement {
    CROP_REQUIREMENTS
        .iter()
        .find(|r| r.crop.eq_ignore_ascii_case(crop.trim()))
        .unwrap_or(&DEFAULT_REQUIREMENT)
}

/// Measurements the requirement table constrains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SoilMoisture,
    Ph,
    Nitrogen,
    Phosphorus,
    Potassium,
    SoilTemperature,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::SoilMoisture => "soil moisture",
            Field::Ph => "pH",
            Field::Nitrogen => "nitrogen",
            Field::Phosphorus => "phosphorus",
            Field::Potassium => "potassium",
            Field::SoilTemperature => "soil temperature",
        }
    }

    /// Display precision for the measured value
    pub fn decimals(&self) -> usize {
        match self {
            Field::Nitrogen | Field::Phosphorus | Field::Potassium => 0,
            Field::SoilMoisture | Field::Ph | Field::SoilTemperature => 1,
        }
    }

    pub fn value(&self, features: &SoilFeatures) -> f64 {
        match self {
            Field::SoilMoisture => features.soil_moisture,
            Field::Ph => features.ph,
            Field::Nitrogen => features.nitrogen,
            Field::Phosphorus => features.phosphorus,
            Field::Potassium => features.potassium,
            Field::SoilTemperature => features.soil_temperature,
        }
    }

    pub fn band(&self, requirement: &CropRequirement) -> Option<Band> {
        match self {
            Field::SoilMoisture => Some(requirement.soil_moisture),
            Field::Ph => Some(requirement.ph),
            Field::Nitrogen => Some(requirement.nitrogen),
            Field::Phosphorus => Some(requirement.phosphorus),
            Field::Potassium => Some(requirement.potassium),
            Field::SoilTemperature => requirement.soil_temperature,
        }
    }
}
