//! Utilidades de validación
//!
//! Funciones helper usadas por los `#[validate(custom = ...)]` de los DTOs
//! y por los controllers antes de tocar el store.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

use crate::models::transport_request::Destination;

lazy_static! {
    // Formato antiguo (ABC-1234) y Mercosul (ABC1D23)
    static ref PLATE_REGEX: Regex = Regex::new(r"^[A-Z]{3}-?[0-9][A-Z0-9][0-9]{2}$").unwrap();
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_empty"));
    }
    Ok(())
}

/// Validar formato de teléfono (básico)
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let clean_phone = value.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
    if clean_phone.len() < 10 || clean_phone.len() > 15 {
        let mut error = ValidationError::new("phone");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de coordenadas GPS
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&lat) {
        let mut error = ValidationError::new("latitude");
        error.add_param("value".into(), &lat);
        error.add_param("range".into(), &"-90.0 to 90.0".to_string());
        return Err(error);
    }

    if !(-180.0..=180.0).contains(&lng) {
        let mut error = ValidationError::new("longitude");
        error.add_param("value".into(), &lng);
        error.add_param("range".into(), &"-180.0 to 180.0".to_string());
        return Err(error);
    }

    Ok(())
}

/// Validar la lista de paradas: al menos una, cada una con dirección y coordenadas válidas
pub fn validate_destinations(destinations: &[Destination]) -> Result<(), ValidationError> {
    if destinations.is_empty() {
        return Err(ValidationError::new("at_least_one_destination"));
    }

    for (index, stop) in destinations.iter().enumerate() {
        if stop.address.trim().is_empty() {
            let mut error = ValidationError::new("destination_address");
            error.add_param("index".into(), &index);
            return Err(error);
        }
        validate_coordinates(stop.lat, stop.lng).map_err(|mut e| {
            e.add_param("index".into(), &index);
            e
        })?;
    }

    Ok(())
}

/// Validar matrícula de vehículo (formato brasileño)
pub fn validate_license_plate(value: &str) -> Result<(), ValidationError> {
    let normalized = value.trim().to_uppercase();
    if !PLATE_REGEX.is_match(&normalized) {
        let mut error = ValidationError::new("license_plate");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(address: &str, lat: f64, lng: f64) -> Destination {
        Destination {
            address: address.to_string(),
            lat,
            lng,
        }
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("(11) 98765-4321").is_ok());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("1234567890123456").is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(-23.5614, -46.6559).is_ok());
        assert!(validate_coordinates(91.0, -46.0).is_err());
        assert!(validate_coordinates(-23.0, -181.0).is_err());
    }

    #[test]
    fn test_validate_destinations() {
        assert!(validate_destinations(&[]).is_err());
        assert!(validate_destinations(&[stop("Shopping Ibirapuera", -23.61, -46.66)]).is_ok());
        assert!(validate_destinations(&[stop("   ", -23.61, -46.66)]).is_err());
        assert!(validate_destinations(&[
            stop("Shopping Ibirapuera", -23.61, -46.66),
            stop("Aeroporto", 123.0, -46.66),
        ])
        .is_err());
    }

    #[test]
    fn test_validate_license_plate() {
        assert!(validate_license_plate("ABC-1234").is_ok());
        assert!(validate_license_plate("abc1d23").is_ok());
        assert!(validate_license_plate("AB-123").is_err());
        assert!(validate_license_plate("ABCD1234").is_err());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("Av. Paulista, 1000").is_ok());
        assert!(validate_not_empty("  ").is_err());
    }
}
