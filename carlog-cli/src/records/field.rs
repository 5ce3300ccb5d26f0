//! Canonical corrective-action schema

/// Type class of a canonical field, selects the coercer used on import
/// and the display rule used on export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Bool,
    Number,
    /// Number displayed with a currency symbol
    Currency,
}

/// Canonical fields of a corrective-action record, in export column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    InternalCarNumber,
    Location,
    Status,
    IncidenceType,
    Type,
    Category,
    ReceivedDate,
    PartNumber,
    PartDescription,
    PartFamily,
    CustomerCarNumber,
    StopTagNumber,
    AuditNcNumber,
    Customer,
    KomatsuTracking,
    WorkOrderNumber,
    ManufactureDate,
    Quantity,
    ProblemDescription,
    DepartmentResponsible,
    DefectCategory,
    Champion,
    ContainmentComplete,
    CorrectiveActionPrevention,
    CorrectiveActionDetection,
    ProposedCost,
    CostApproved,
    InitialResp,
    FinalRespDueDate,
    CompletedRespActual,
    DaysToClose,
    ClosedDate,
    EmployeeId,
    RmaNumber,
    FollowUpContact,
    FollowUpDebitCost,
    FollowUpComments,
}

impl Field {
    /// All fields in export column order
    pub const ALL: [Field; 37] = [
        Field::InternalCarNumber,
        Field::Location,
        Field::Status,
        Field::IncidenceType,
        Field::Type,
        Field::Category,
        Field::ReceivedDate,
        Field::PartNumber,
        Field::PartDescription,
        Field::PartFamily,
        Field::CustomerCarNumber,
        Field::StopTagNumber,
        Field::AuditNcNumber,
        Field::Customer,
        Field::KomatsuTracking,
        Field::WorkOrderNumber,
        Field::ManufactureDate,
        Field::Quantity,
        Field::ProblemDescription,
        Field::DepartmentResponsible,
        Field::DefectCategory,
        Field::Champion,
        Field::ContainmentComplete,
        Field::CorrectiveActionPrevention,
        Field::CorrectiveActionDetection,
        Field::ProposedCost,
        Field::CostApproved,
        Field::InitialResp,
        Field::FinalRespDueDate,
        Field::CompletedRespActual,
        Field::DaysToClose,
        Field::ClosedDate,
        Field::EmployeeId,
        Field::RmaNumber,
        Field::FollowUpContact,
        Field::FollowUpDebitCost,
        Field::FollowUpComments,
    ];

    /// Wire name of the field (camelCase, as stored and serialized)
    pub fn name(&self) -> &'static str {
        match self {
            Field::InternalCarNumber => "internalCarNumber",
            Field::Location => "location",
            Field::Status => "status",
            Field::IncidenceType => "incidenceType",
            Field::Type => "type",
            Field::Category => "category",
            Field::ReceivedDate => "receivedDate",
            Field::PartNumber => "partNumber",
            Field::PartDescription => "partDescription",
            Field::PartFamily => "partFamily",
            Field::CustomerCarNumber => "customerCarNumber",
            Field::StopTagNumber => "stopTagNumber",
            Field::AuditNcNumber => "auditNcNumber",
            Field::Customer => "customer",
            Field::KomatsuTracking => "komatsuTracking",
            Field::WorkOrderNumber => "workOrderNumber",
            Field::ManufactureDate => "manufactureDate",
            Field::Quantity => "quantity",
            Field::ProblemDescription => "problemDescription",
            Field::DepartmentResponsible => "departmentResponsible",
            Field::DefectCategory => "defectCategory",
            Field::Champion => "champion",
            Field::ContainmentComplete => "containmentComplete",
            Field::CorrectiveActionPrevention => "correctiveActionPrevention",
            Field::CorrectiveActionDetection => "correctiveActionDetection",
            Field::ProposedCost => "proposedCost",
            Field::CostApproved => "costApproved",
            Field::InitialResp => "initialResp",
            Field::FinalRespDueDate => "finalRespDueDate",
            Field::CompletedRespActual => "completedRespActual",
            Field::DaysToClose => "daysToClose",
            Field::ClosedDate => "closedDate",
            Field::EmployeeId => "employeeId",
            Field::RmaNumber => "rmaNumber",
            Field::FollowUpContact => "followUpContact",
            Field::FollowUpDebitCost => "followUpDebitCost",
            Field::FollowUpComments => "followUpComments",
        }
    }

    /// Look up a canonical field by its wire name
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::ReceivedDate
            | Field::ManufactureDate
            | Field::FinalRespDueDate
            | Field::CompletedRespActual
            | Field::ClosedDate => FieldKind::Date,
            Field::ContainmentComplete | Field::CostApproved => FieldKind::Bool,
            Field::Quantity | Field::DaysToClose => FieldKind::Number,
            Field::ProposedCost | Field::FollowUpDebitCost => FieldKind::Currency,
            _ => FieldKind::Text,
        }
    }

    /// Column header used on export
    pub fn label(&self) -> &'static str {
        match self {
            Field::InternalCarNumber => "Internal CAR #",
            Field::Location => "Location",
            Field::Status => "Status",
            Field::IncidenceType => "Incidence Type",
            Field::Type => "Type",
            Field::Category => "Category",
            Field::ReceivedDate => "Received Date",
            Field::PartNumber => "Part Number",
            Field::PartDescription => "Part Description",
            Field::PartFamily => "Part Family",
            Field::CustomerCarNumber => "Cust. CAR #",
            Field::StopTagNumber => "Stop Tag #",
            Field::AuditNcNumber => "Audit NC #",
            Field::Customer => "Customer",
            Field::KomatsuTracking => "Komatsu Tracking",
            Field::WorkOrderNumber => "Work Order #",
            Field::ManufactureDate => "Manufacture Date",
            Field::Quantity => "Quantity",
            Field::ProblemDescription => "Problem Description",
            Field::DepartmentResponsible => "Department Responsible",
            Field::DefectCategory => "Defect Category",
            Field::Champion => "Champion",
            Field::ContainmentComplete => "Containment Complete?",
            Field::CorrectiveActionPrevention => "Corrective Action Prevention",
            Field::CorrectiveActionDetection => "Corrective Action Detection",
            Field::ProposedCost => "Proposed Cost",
            Field::CostApproved => "Cost Approved?",
            Field::InitialResp => "Initial Resp.",
            Field::FinalRespDueDate => "Final Resp. Due Date",
            Field::CompletedRespActual => "Completed Resp. Actual",
            Field::DaysToClose => "# Days to Close",
            Field::ClosedDate => "Closed Date",
            Field::EmployeeId => "Employee ID",
            Field::RmaNumber => "RMA #",
            Field::FollowUpContact => "Contact",
            Field::FollowUpDebitCost => "Debit Cost",
            Field::FollowUpComments => "Comments",
        }
    }

    /// Export column width in characters
    pub fn width(&self) -> f64 {
        match self {
            Field::Status | Field::Quantity => 12.0,
            Field::IncidenceType
            | Field::PartNumber
            | Field::PartFamily
            | Field::KomatsuTracking
            | Field::ManufactureDate
            | Field::DaysToClose => 18.0,
            Field::PartDescription => 30.0,
            Field::Customer
            | Field::DefectCategory
            | Field::Champion
            | Field::FinalRespDueDate
            | Field::FollowUpContact => 20.0,
            Field::ProblemDescription | Field::FollowUpComments => 40.0,
            Field::DepartmentResponsible => 25.0,
            Field::ContainmentComplete | Field::CompletedRespActual => 22.0,
            Field::CorrectiveActionPrevention | Field::CorrectiveActionDetection => 35.0,
            _ => 15.0,
        }
    }
}

/// Type class for a (possibly non-canonical) field name
///
/// Keys produced by the degraded header mapping are not canonical and are
/// treated as free text.
pub fn kind_of(name: &str) -> FieldKind {
    Field::from_name(name)
        .map(|f| f.kind())
        .unwrap_or(FieldKind::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("nonsense"), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Field::ReceivedDate.kind(), FieldKind::Date);
        assert_eq!(Field::CostApproved.kind(), FieldKind::Bool);
        assert_eq!(Field::Quantity.kind(), FieldKind::Number);
        assert_eq!(Field::ProposedCost.kind(), FieldKind::Currency);
        assert_eq!(Field::Champion.kind(), FieldKind::Text);
        assert_eq!(kind_of("somecustomheader"), FieldKind::Text);
        assert_eq!(kind_of("closedDate"), FieldKind::Date);
    }
}
