//! Service report draft: job, customer, timing, engineers, service details,
//! parts and signatures. Nothing is persisted; saving validates and renders.

mod details;

pub use details::{DetailField, ServiceDetails, ServiceType};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationError;

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";
pub const TIME_FORMAT: &str = "%H:%M";

pub const ENGINEERS: [&str; 8] = [
    "Ali Hassan",
    "Tom Jone",
    "Ahmed Ali",
    "John Smith",
    "Mohammed Ahmed",
    "David Wilson",
    "Omar Hassan",
    "Michael Brown",
];

pub const JOB_TYPES: [&str; 6] = ["Site Survey", "PPM", "Fitt-Out", "Rectification", "Call-Out", "Others"];

pub const CUSTOMERS: [&str; 10] = [
    "Emirates NBD",
    "Dubai Municipality",
    "ADNOC",
    "Dubai Airports",
    "Emaar Properties",
    "Nakheel",
    "DEWA",
    "Dubai Health Authority",
    "Dubai Police",
    "RTA Dubai",
];

pub const LOCATIONS: [&str; 15] = [
    "Dubai Marina",
    "Downtown Dubai",
    "Business Bay",
    "Jumeirah",
    "Deira",
    "Bur Dubai",
    "Al Barsha",
    "Dubai Investment Park",
    "International City",
    "Dubai Silicon Oasis",
    "Sharjah",
    "Ajman",
    "Abu Dhabi",
    "Al Ain",
    "Fujairah",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown service type: {0}")]
    UnknownServiceType(String),

    #[error("'{value}' is not a valid {field}")]
    NotAnOption { field: &'static str, value: String },

    #[error("{field} must look like {expected}, got '{value}'")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Unknown engineer: {0}")]
    UnknownEngineer(String),

    #[error("Select a service type first")]
    NoServiceType,

    #[error("{service_type} has no {field} field")]
    UnsupportedDetail {
        service_type: ServiceType,
        field: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ============================================================================
// Fields
// ============================================================================

/// What a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Date,
    DateTime,
    Time,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    ServiceReportNo,
    ServiceReportDate,
    NextPpmDate,
    JobNo,
    JobDate,
    LpoNo,
    JobType,
    OtherJobType,
    Customer,
    SiteName,
    SiteNo,
    Location,
    DcdNo,
    CallReceivedTime,
    TimeIn,
    TimeOut,
    Observation,
    FaultIdentification,
    Recommendation,
    CustomerComments,
    TechnicianName,
    TechnicianDate,
    CustomerName,
    CustomerDate,
}

impl ReportField {
    pub const ALL: [ReportField; 24] = [
        ReportField::ServiceReportNo,
        ReportField::ServiceReportDate,
        ReportField::NextPpmDate,
        ReportField::JobNo,
        ReportField::JobDate,
        ReportField::LpoNo,
        ReportField::JobType,
        ReportField::OtherJobType,
        ReportField::Customer,
        ReportField::SiteName,
        ReportField::SiteNo,
        ReportField::Location,
        ReportField::DcdNo,
        ReportField::CallReceivedTime,
        ReportField::TimeIn,
        ReportField::TimeOut,
        ReportField::Observation,
        ReportField::FaultIdentification,
        ReportField::Recommendation,
        ReportField::CustomerComments,
        ReportField::TechnicianName,
        ReportField::TechnicianDate,
        ReportField::CustomerName,
        ReportField::CustomerDate,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ReportField::ServiceReportNo => "serviceReportNo",
            ReportField::ServiceReportDate => "serviceReportDate",
            ReportField::NextPpmDate => "nextPPMDate",
            ReportField::JobNo => "jobNo",
            ReportField::JobDate => "jobDate",
            ReportField::LpoNo => "lpoNo",
            ReportField::JobType => "jobType",
            ReportField::OtherJobType => "otherJobType",
            ReportField::Customer => "customer",
            ReportField::SiteName => "siteName",
            ReportField::SiteNo => "siteNo",
            ReportField::Location => "location",
            ReportField::DcdNo => "dcdNo",
            ReportField::CallReceivedTime => "callReceivedTime",
            ReportField::TimeIn => "timeIn",
            ReportField::TimeOut => "timeOut",
            ReportField::Observation => "observation",
            ReportField::FaultIdentification => "faultIdentification",
            ReportField::Recommendation => "recommendation",
            ReportField::CustomerComments => "customerComments",
            ReportField::TechnicianName => "technicianName",
            ReportField::TechnicianDate => "technicianDate",
            ReportField::CustomerName => "customerName",
            ReportField::CustomerDate => "customerDate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportField::ServiceReportNo => "Service Report No",
            ReportField::ServiceReportDate => "Service Report Date",
            ReportField::NextPpmDate => "Next PPM Date",
            ReportField::JobNo => "Job No",
            ReportField::JobDate => "Job Date",
            ReportField::LpoNo => "LPO No",
            ReportField::JobType => "Job Type",
            ReportField::OtherJobType => "Other Job Type",
            ReportField::Customer => "Customer",
            ReportField::SiteName => "Site Name",
            ReportField::SiteNo => "Site No",
            ReportField::Location => "Location",
            ReportField::DcdNo => "DCD No",
            ReportField::CallReceivedTime => "Call Received Time",
            ReportField::TimeIn => "Time In",
            ReportField::TimeOut => "Time Out",
            ReportField::Observation => "Observation",
            ReportField::FaultIdentification => "Fault Identification",
            ReportField::Recommendation => "Recommendation",
            ReportField::CustomerComments => "Customer Comments",
            ReportField::TechnicianName => "Technician Name",
            ReportField::TechnicianDate => "Technician Date",
            ReportField::CustomerName => "Customer Name",
            ReportField::CustomerDate => "Customer Date",
        }
    }

    fn kind(&self) -> FieldKind {
        match self {
            ReportField::ServiceReportDate
            | ReportField::NextPpmDate
            | ReportField::JobDate
            | ReportField::TechnicianDate
            | ReportField::CustomerDate => FieldKind::Date,
            ReportField::TimeIn | ReportField::TimeOut => FieldKind::DateTime,
            ReportField::CallReceivedTime => FieldKind::Time,
            ReportField::JobType => FieldKind::Choice(&JOB_TYPES),
            ReportField::Customer => FieldKind::Choice(&CUSTOMERS),
            ReportField::Location => FieldKind::Choice(&LOCATIONS),
            _ => FieldKind::Text,
        }
    }

    /// Bring a raw value into the field's canonical form
    fn normalize(&self, value: &str) -> Result<String, ReportError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(String::new());
        }
        let invalid = |expected| ReportError::InvalidFormat {
            field: self.label(),
            value: value.to_string(),
            expected,
        };
        match self.kind() {
            FieldKind::Text => Ok(value.to_string()),
            FieldKind::Date => NaiveDate::parse_from_str(value, DATE_FORMAT)
                .map(|d| d.format(DATE_FORMAT).to_string())
                .map_err(|_| invalid("DD/MM/YYYY")),
            FieldKind::DateTime => NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
                .map(|d| d.format(DATE_TIME_FORMAT).to_string())
                .map_err(|_| invalid("DD/MM/YYYY HH:MM")),
            FieldKind::Time => NaiveTime::parse_from_str(value, TIME_FORMAT)
                .map(|t| t.format(TIME_FORMAT).to_string())
                .map_err(|_| invalid("HH:MM")),
            FieldKind::Choice(options) => pick(options, value).ok_or_else(|| ReportError::NotAnOption {
                field: self.label(),
                value: value.to_string(),
            }),
        }
    }

    /// Allowed values for picker fields
    pub fn options(&self) -> Option<&'static [&'static str]> {
        match self.kind() {
            FieldKind::Choice(options) => Some(options),
            _ => None,
        }
    }
}

impl FromStr for ReportField {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReportError::UnknownField(s.to_string()))
    }
}

/// Match an option by name (any case) or 1-based position
fn pick(options: &[&str], value: &str) -> Option<String> {
    if let Ok(n) = value.parse::<usize>() {
        if (1..=options.len()).contains(&n) {
            return Some(options[n - 1].to_string());
        }
    }
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(value))
        .map(|o| o.to_string())
}

/// `HH:MM` between two `DD/MM/YYYY HH:MM` stamps, empty unless `end` is later
pub fn total_time(start: &str, end: &str) -> String {
    let parse = |s: &str| NaiveDateTime::parse_from_str(s.trim(), DATE_TIME_FORMAT).ok();
    match (parse(start), parse(end)) {
        (Some(start), Some(end)) if end > start => {
            let minutes = (end - start).num_minutes();
            format!("{:02}:{:02}", minutes / 60, minutes % 60)
        }
        _ => String::new(),
    }
}

// ============================================================================
// Parts
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartsInput {
    pub parts_required: String,
    pub brand_name: String,
    pub model_name: String,
    pub part_number: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartsItem {
    /// Time-ordered id, used only for deletion
    pub id: Uuid,
    pub parts_required: String,
    pub brand_name: String,
    pub model_name: String,
    pub part_number: String,
    pub quantity: String,
}

// ============================================================================
// Draft
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceReportDraft {
    pub service_report_no: String,
    pub service_report_date: String,
    pub next_ppm_date: String,
    pub job_no: String,
    pub job_date: String,
    pub lpo_no: String,
    pub job_type: String,
    pub other_job_type: String,
    pub customer: String,
    pub site_name: String,
    pub site_no: String,
    pub location: String,
    pub dcd_no: String,
    pub call_received_time: String,
    pub time_in: String,
    pub time_out: String,
    /// Derived from `time_in` and `time_out`
    total_time: String,
    pub selected_engineers: Vec<String>,
    service_details: Option<ServiceDetails>,
    pub observation: String,
    parts: Vec<PartsItem>,
    pub fault_identification: String,
    pub recommendation: String,
    pub customer_comments: String,
    pub technician_name: String,
    pub technician_date: String,
    pub customer_name: String,
    pub customer_date: String,
}

impl ServiceReportDraft {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            service_report_date: today.format(DATE_FORMAT).to_string(),
            ..Default::default()
        }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    fn slot(&self, field: ReportField) -> &String {
        match field {
            ReportField::ServiceReportNo => &self.service_report_no,
            ReportField::ServiceReportDate => &self.service_report_date,
            ReportField::NextPpmDate => &self.next_ppm_date,
            ReportField::JobNo => &self.job_no,
            ReportField::JobDate => &self.job_date,
            ReportField::LpoNo => &self.lpo_no,
            ReportField::JobType => &self.job_type,
            ReportField::OtherJobType => &self.other_job_type,
            ReportField::Customer => &self.customer,
            ReportField::SiteName => &self.site_name,
            ReportField::SiteNo => &self.site_no,
            ReportField::Location => &self.location,
            ReportField::DcdNo => &self.dcd_no,
            ReportField::CallReceivedTime => &self.call_received_time,
            ReportField::TimeIn => &self.time_in,
            ReportField::TimeOut => &self.time_out,
            ReportField::Observation => &self.observation,
            ReportField::FaultIdentification => &self.fault_identification,
            ReportField::Recommendation => &self.recommendation,
            ReportField::CustomerComments => &self.customer_comments,
            ReportField::TechnicianName => &self.technician_name,
            ReportField::TechnicianDate => &self.technician_date,
            ReportField::CustomerName => &self.customer_name,
            ReportField::CustomerDate => &self.customer_date,
        }
    }

    fn slot_mut(&mut self, field: ReportField) -> &mut String {
        match field {
            ReportField::ServiceReportNo => &mut self.service_report_no,
            ReportField::ServiceReportDate => &mut self.service_report_date,
            ReportField::NextPpmDate => &mut self.next_ppm_date,
            ReportField::JobNo => &mut self.job_no,
            ReportField::JobDate => &mut self.job_date,
            ReportField::LpoNo => &mut self.lpo_no,
            ReportField::JobType => &mut self.job_type,
            ReportField::OtherJobType => &mut self.other_job_type,
            ReportField::Customer => &mut self.customer,
            ReportField::SiteName => &mut self.site_name,
            ReportField::SiteNo => &mut self.site_no,
            ReportField::Location => &mut self.location,
            ReportField::DcdNo => &mut self.dcd_no,
            ReportField::CallReceivedTime => &mut self.call_received_time,
            ReportField::TimeIn => &mut self.time_in,
            ReportField::TimeOut => &mut self.time_out,
            ReportField::Observation => &mut self.observation,
            ReportField::FaultIdentification => &mut self.fault_identification,
            ReportField::Recommendation => &mut self.recommendation,
            ReportField::CustomerComments => &mut self.customer_comments,
            ReportField::TechnicianName => &mut self.technician_name,
            ReportField::TechnicianDate => &mut self.technician_date,
            ReportField::CustomerName => &mut self.customer_name,
            ReportField::CustomerDate => &mut self.customer_date,
        }
    }

    pub fn get(&self, field: ReportField) -> &str {
        self.slot(field)
    }

    /// Set a field, keeping derived values in step
    pub fn set_field(&mut self, field: ReportField, value: &str) -> Result<(), ReportError> {
        let value = field.normalize(value)?;
        *self.slot_mut(field) = value;

        match field {
            ReportField::TimeIn | ReportField::TimeOut => {
                self.total_time = total_time(&self.time_in, &self.time_out);
            }
            ReportField::Customer if !self.customer.is_empty() => {
                self.customer_name = self.customer.clone();
            }
            _ => {}
        }
        Ok(())
    }

    pub fn total_time(&self) -> &str {
        &self.total_time
    }

    /// Toggle an engineer from the roster. Returns whether they are now selected.
    pub fn toggle_engineer(&mut self, name: &str) -> Result<bool, ReportError> {
        let name = pick(&ENGINEERS, name.trim()).ok_or_else(|| ReportError::UnknownEngineer(name.to_string()))?;
        if let Some(pos) = self.selected_engineers.iter().position(|e| *e == name) {
            self.selected_engineers.remove(pos);
            Ok(false)
        } else {
            self.selected_engineers.push(name);
            Ok(true)
        }
    }

    pub fn service_type(&self) -> Option<ServiceType> {
        self.service_details.as_ref().map(ServiceDetails::service_type)
    }

    pub fn service_details(&self) -> Option<&ServiceDetails> {
        self.service_details.as_ref()
    }

    /// Any selection, including the current one, starts from empty details
    pub fn select_service_type(&mut self, service_type: ServiceType) {
        tracing::debug!("Service type set to {}", service_type);
        self.service_details = Some(ServiceDetails::empty(service_type));
    }

    pub fn set_detail(&mut self, field: DetailField, value: &str) -> Result<(), ReportError> {
        self.service_details
            .as_mut()
            .ok_or(ReportError::NoServiceType)?
            .set(field, value.trim())
    }

    pub fn parts(&self) -> &[PartsItem] {
        &self.parts
    }

    pub fn add_part(&mut self, input: PartsInput) -> Result<Uuid, ReportError> {
        if input.parts_required.trim().is_empty() {
            return Err(ValidationError::PartsRequired.into());
        }
        let id = Uuid::now_v7();
        self.parts.push(PartsItem {
            id,
            parts_required: input.parts_required.trim().to_string(),
            brand_name: input.brand_name.trim().to_string(),
            model_name: input.model_name.trim().to_string(),
            part_number: input.part_number.trim().to_string(),
            quantity: input.quantity.trim().to_string(),
        });
        Ok(id)
    }

    /// Remove the item with this id; the rest keep their order
    pub fn delete_part(&mut self, id: Uuid) -> bool {
        let before = self.parts.len();
        self.parts.retain(|p| p.id != id);
        self.parts.len() != before
    }

    pub fn validate_for_save(&self) -> Result<(), ValidationError> {
        let missing: Vec<&'static str> = [ReportField::ServiceReportNo, ReportField::Customer, ReportField::SiteName]
            .into_iter()
            .filter(|f| self.get(*f).trim().is_empty())
            .map(|f| f.label())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        Ok(())
    }

    /// Reset everything; the report date goes back to `today`
    pub fn clear(&mut self, today: NaiveDate) {
        *self = Self::new(today);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let line = |out: &mut String, label: &str, value: &str| {
            let _ = writeln!(out, "  {:<24} {}", format!("{}:", label), value);
        };
        let section = |out: &mut String, title: &str| {
            let _ = writeln!(out, "\n{}", title);
        };

        let _ = writeln!(out, "SERVICE REPORT");
        for field in [ReportField::ServiceReportNo, ReportField::ServiceReportDate, ReportField::NextPpmDate] {
            line(&mut out, field.label(), self.get(field));
        }

        section(&mut out, "Job Details");
        for field in [
            ReportField::JobNo,
            ReportField::JobDate,
            ReportField::LpoNo,
            ReportField::JobType,
        ] {
            line(&mut out, field.label(), self.get(field));
        }
        if self.job_type == "Others" {
            line(&mut out, ReportField::OtherJobType.label(), &self.other_job_type);
        }
        for field in [
            ReportField::Customer,
            ReportField::SiteName,
            ReportField::SiteNo,
            ReportField::Location,
            ReportField::DcdNo,
            ReportField::CallReceivedTime,
            ReportField::TimeIn,
            ReportField::TimeOut,
        ] {
            line(&mut out, field.label(), self.get(field));
        }
        line(&mut out, "Total Time", &self.total_time);

        section(&mut out, "Engineers");
        line(&mut out, "Selected", &self.selected_engineers.join(", "));

        section(&mut out, "Service Details");
        match &self.service_details {
            Some(details) => {
                line(&mut out, "Service Type", details.service_type().label());
                for field in details.service_type().fields() {
                    line(&mut out, field.label(), details.get(*field).unwrap_or_default());
                }
            }
            None => line(&mut out, "Service Type", ""),
        }
        line(&mut out, ReportField::Observation.label(), &self.observation);

        section(&mut out, "Parts");
        if self.parts.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for (i, part) in self.parts.iter().enumerate() {
            let _ = writeln!(
                out,
                "  Sl. No. {}  {} | {} | {} | {} | qty {}",
                i + 1,
                part.parts_required,
                part.brand_name,
                part.model_name,
                part.part_number,
                part.quantity
            );
        }

        section(&mut out, "Findings");
        for field in [
            ReportField::FaultIdentification,
            ReportField::Recommendation,
            ReportField::CustomerComments,
        ] {
            line(&mut out, field.label(), self.get(field));
        }

        section(&mut out, "Signatures");
        for field in [
            ReportField::TechnicianName,
            ReportField::TechnicianDate,
            ReportField::CustomerName,
            ReportField::CustomerDate,
        ] {
            line(&mut out, field.label(), self.get(field));
        }
        out
    }
}
