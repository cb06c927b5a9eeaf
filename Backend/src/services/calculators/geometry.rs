use std::f64::consts::PI;

use crate::models::rearing_unit::UnitShape;
use super::ration::round2;

/// Physical dimensions of a tank or cage, in metres.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dimensions {
    pub length_m: Option<f64>,
    pub width_m: Option<f64>,
    pub diameter_m: Option<f64>,
    pub height_m: Option<f64>,
}

/// Water volume in m3. None when a dimension required by the shape is
/// missing or not strictly positive.
pub fn volume_m3(shape: UnitShape, dims: &Dimensions) -> Option<f64> {
    let positive = |v: Option<f64>| v.filter(|x| *x > 0.0);
    let height = positive(dims.height_m)?;

    match shape {
        UnitShape::Rectangular => {
            let length = positive(dims.length_m)?;
            let width = positive(dims.width_m)?;
            Some(length * width * height)
        }
        UnitShape::Circular => {
            let radius = positive(dims.diameter_m)? / 2.0;
            Some(PI * radius * radius * height)
        }
    }
}

/// volume x density, rounded to 2 decimals
pub fn max_biomass_kg(volume_m3: f64, density_kg_m3: f64) -> f64 {
    round2(volume_m3 * density_kg_m3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangular_volume() {
        let dims = Dimensions {
            length_m: Some(4.0),
            width_m: Some(2.0),
            height_m: Some(1.5),
            ..Default::default()
        };
        assert_eq!(volume_m3(UnitShape::Rectangular, &dims), Some(12.0));
        assert_eq!(max_biomass_kg(12.0, 25.0), 300.0);
    }

    #[test]
    fn test_circular_volume() {
        let dims = Dimensions {
            diameter_m: Some(2.0),
            height_m: Some(1.0),
            ..Default::default()
        };
        let volume = volume_m3(UnitShape::Circular, &dims).unwrap();
        assert!((volume - PI).abs() < 1e-9);
        assert_eq!(max_biomass_kg(volume, 15.0), 47.12);
    }

    #[test]
    fn test_missing_dimension() {
        let dims = Dimensions {
            length_m: Some(4.0),
            height_m: Some(1.0),
            ..Default::default()
        };
        assert_eq!(volume_m3(UnitShape::Rectangular, &dims), None);

        let zero_height = Dimensions {
            diameter_m: Some(3.0),
            height_m: Some(0.0),
            ..Default::default()
        };
        assert_eq!(volume_m3(UnitShape::Circular, &zero_height), None);
    }
}
