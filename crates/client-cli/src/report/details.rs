//! Category-specific service detail fields

use std::fmt;
use std::str::FromStr;

use super::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    FireAlarm,
    EmergencyLighting,
    FireFighting,
    ElvSystem,
    HvacSystem,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        ServiceType::FireAlarm,
        ServiceType::EmergencyLighting,
        ServiceType::FireFighting,
        ServiceType::ElvSystem,
        ServiceType::HvacSystem,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::FireAlarm => "Fire Alarm",
            ServiceType::EmergencyLighting => "Emergency Lighting",
            ServiceType::FireFighting => "Fire Fighting",
            ServiceType::ElvSystem => "ELV System",
            ServiceType::HvacSystem => "HVAC System",
        }
    }

    /// Fields shown for this category, in display order
    pub fn fields(&self) -> &'static [DetailField] {
        match self {
            ServiceType::FireAlarm => &[DetailField::Brand, DetailField::NoOfLoopsZone, DetailField::Others],
            ServiceType::FireFighting => &[
                DetailField::FireHoseReel,
                DetailField::FireExtinguisher,
                DetailField::FirePump,
            ],
            ServiceType::EmergencyLighting | ServiceType::ElvSystem | ServiceType::HvacSystem => {
                &[DetailField::Brand, DetailField::Type, DetailField::Others]
            }
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ServiceType {
    type Err = ReportError;

    /// Accepts the label in any case, or its 1-based position in the list
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<usize>() {
            if (1..=Self::ALL.len()).contains(&n) {
                return Ok(Self::ALL[n - 1]);
            }
        }
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ReportError::UnknownServiceType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    Brand,
    NoOfLoopsZone,
    Type,
    FireHoseReel,
    FireExtinguisher,
    FirePump,
    Others,
}

impl DetailField {
    const ALL: [DetailField; 7] = [
        DetailField::Brand,
        DetailField::NoOfLoopsZone,
        DetailField::Type,
        DetailField::FireHoseReel,
        DetailField::FireExtinguisher,
        DetailField::FirePump,
        DetailField::Others,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            DetailField::Brand => "brand",
            DetailField::NoOfLoopsZone => "noOfLoopsZone",
            DetailField::Type => "type",
            DetailField::FireHoseReel => "fireHoseReel",
            DetailField::FireExtinguisher => "fireExtinguisher",
            DetailField::FirePump => "firePump",
            DetailField::Others => "others",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DetailField::Brand => "Brand",
            DetailField::NoOfLoopsZone => "No. of Loops/Zone",
            DetailField::Type => "Type",
            DetailField::FireHoseReel => "Brand (Fire Hose Reel)",
            DetailField::FireExtinguisher => "Brand (Fire Extinguisher)",
            DetailField::FirePump => "Brand (Fire Pump)",
            DetailField::Others => "Others",
        }
    }
}

impl FromStr for DetailField {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReportError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FireAlarmDetails {
    pub brand: String,
    pub no_of_loops_zone: String,
    pub others: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FireFightingDetails {
    pub fire_hose_reel: String,
    pub fire_extinguisher: String,
    pub fire_pump: String,
}

/// Brand, type and free text: emergency lighting, ELV and HVAC
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquipmentDetails {
    pub brand: String,
    pub kind: String,
    pub others: String,
}

/// Detail record, one variant per service type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceDetails {
    FireAlarm(FireAlarmDetails),
    EmergencyLighting(EquipmentDetails),
    FireFighting(FireFightingDetails),
    ElvSystem(EquipmentDetails),
    HvacSystem(EquipmentDetails),
}

impl ServiceDetails {
    pub fn empty(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::FireAlarm => ServiceDetails::FireAlarm(FireAlarmDetails::default()),
            ServiceType::EmergencyLighting => ServiceDetails::EmergencyLighting(EquipmentDetails::default()),
            ServiceType::FireFighting => ServiceDetails::FireFighting(FireFightingDetails::default()),
            ServiceType::ElvSystem => ServiceDetails::ElvSystem(EquipmentDetails::default()),
            ServiceType::HvacSystem => ServiceDetails::HvacSystem(EquipmentDetails::default()),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceDetails::FireAlarm(_) => ServiceType::FireAlarm,
            ServiceDetails::EmergencyLighting(_) => ServiceType::EmergencyLighting,
            ServiceDetails::FireFighting(_) => ServiceType::FireFighting,
            ServiceDetails::ElvSystem(_) => ServiceType::ElvSystem,
            ServiceDetails::HvacSystem(_) => ServiceType::HvacSystem,
        }
    }

    fn slot(&self, field: DetailField) -> Option<&String> {
        match (self, field) {
            (ServiceDetails::FireAlarm(d), DetailField::Brand) => Some(&d.brand),
            (ServiceDetails::FireAlarm(d), DetailField::NoOfLoopsZone) => Some(&d.no_of_loops_zone),
            (ServiceDetails::FireAlarm(d), DetailField::Others) => Some(&d.others),
            (ServiceDetails::FireFighting(d), DetailField::FireHoseReel) => Some(&d.fire_hose_reel),
            (ServiceDetails::FireFighting(d), DetailField::FireExtinguisher) => Some(&d.fire_extinguisher),
            (ServiceDetails::FireFighting(d), DetailField::FirePump) => Some(&d.fire_pump),
            (
                ServiceDetails::EmergencyLighting(d) | ServiceDetails::ElvSystem(d) | ServiceDetails::HvacSystem(d),
                field,
            ) => match field {
                DetailField::Brand => Some(&d.brand),
                DetailField::Type => Some(&d.kind),
                DetailField::Others => Some(&d.others),
                _ => None,
            },
            _ => None,
        }
    }

    fn slot_mut(&mut self, field: DetailField) -> Option<&mut String> {
        match (self, field) {
            (ServiceDetails::FireAlarm(d), DetailField::Brand) => Some(&mut d.brand),
            (ServiceDetails::FireAlarm(d), DetailField::NoOfLoopsZone) => Some(&mut d.no_of_loops_zone),
            (ServiceDetails::FireAlarm(d), DetailField::Others) => Some(&mut d.others),
            (ServiceDetails::FireFighting(d), DetailField::FireHoseReel) => Some(&mut d.fire_hose_reel),
            (ServiceDetails::FireFighting(d), DetailField::FireExtinguisher) => Some(&mut d.fire_extinguisher),
            (ServiceDetails::FireFighting(d), DetailField::FirePump) => Some(&mut d.fire_pump),
            (
                ServiceDetails::EmergencyLighting(d) | ServiceDetails::ElvSystem(d) | ServiceDetails::HvacSystem(d),
                field,
            ) => match field {
                DetailField::Brand => Some(&mut d.brand),
                DetailField::Type => Some(&mut d.kind),
                DetailField::Others => Some(&mut d.others),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn get(&self, field: DetailField) -> Option<&str> {
        self.slot(field).map(String::as_str)
    }

    pub fn set(&mut self, field: DetailField, value: &str) -> Result<(), ReportError> {
        let service_type = self.service_type();
        let slot = self.slot_mut(field).ok_or(ReportError::UnsupportedDetail {
            service_type,
            field: field.label(),
        })?;
        *slot = value.to_string();
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.service_type()
            .fields()
            .iter()
            .all(|f| self.get(*f).map_or(true, str::is_empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_per_category() {
        let keys = |t: ServiceType| t.fields().iter().map(|f| f.key()).collect::<Vec<_>>();
        assert_eq!(keys(ServiceType::FireAlarm), vec!["brand", "noOfLoopsZone", "others"]);
        assert_eq!(keys(ServiceType::EmergencyLighting), vec!["brand", "type", "others"]);
        assert_eq!(
            keys(ServiceType::FireFighting),
            vec!["fireHoseReel", "fireExtinguisher", "firePump"]
        );
        assert_eq!(keys(ServiceType::ElvSystem), keys(ServiceType::HvacSystem));
    }

    #[test]
    fn test_every_listed_field_is_settable() {
        for t in ServiceType::ALL {
            let mut details = ServiceDetails::empty(t);
            assert!(details.is_empty());
            for field in t.fields() {
                details.set(*field, "x").unwrap();
                assert_eq!(details.get(*field), Some("x"));
            }
            assert!(!details.is_empty());
        }
    }

    #[test]
    fn test_foreign_field_is_rejected() {
        let mut details = ServiceDetails::empty(ServiceType::FireFighting);
        let err = details.set(DetailField::Brand, "Bosch").unwrap_err();
        assert!(matches!(
            err,
            ReportError::UnsupportedDetail {
                service_type: ServiceType::FireFighting,
                ..
            }
        ));
        assert_eq!(details.get(DetailField::Brand), None);
    }

    #[test]
    fn test_parse_service_type() {
        assert_eq!("hvac system".parse::<ServiceType>().unwrap(), ServiceType::HvacSystem);
        assert_eq!("2".parse::<ServiceType>().unwrap(), ServiceType::EmergencyLighting);
        assert!("6".parse::<ServiceType>().is_err());
        assert!("Plumbing".parse::<ServiceType>().is_err());
        assert_eq!("FIREPUMP".parse::<DetailField>().unwrap(), DetailField::FirePump);
    }
}
