//! Rows installed by [`super::SqliteDatabase::seed_defaults`] on a fresh store.

/// Seed row for the rule table.
#[derive(Debug, Clone, Copy)]
pub struct SeedRule {
    pub id: &'static str,
    pub rule_set: &'static str,
    pub position: i64,
    pub body: &'static str,
}

pub const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("ID", "National identity card"),
    ("FR", "Foreign resident card"),
    ("PP", "Passport"),
    ("DL", "Driver license"),
];

pub const POSITIONS: &[(&str, &str)] = &[
    ("DEV", "Software developer"),
    ("QA", "Quality analyst"),
    ("HR", "Human resources analyst"),
    ("MGR", "Manager"),
];

pub const DEFAULT_RULES: &[SeedRule] = &[
    SeedRule {
        id: "NORMALIZE_FIELDS",
        rule_set: "validation",
        position: 5,
        body: r#"
let names = context.names;
names.trim();
context.names = names;

let last_names = context.last_names;
last_names.trim();
context.last_names = last_names;

let number = context.document_number;
number.trim();
context.document_number = number;

context.document_type = context.document_type.to_upper();
context.position = context.position.to_upper();
"#,
    },
    SeedRule {
        id: "REQUIRED_FIELDS",
        rule_set: "validation",
        position: 10,
        body: r#"
let required = [
    ["names", "Names are required"],
    ["last_names", "Last names are required"],
    ["document_type", "Document type is required"],
    ["document_number", "Document number is required"],
    ["date_of_birth", "Date of birth is required"],
    ["date_affiliation_company", "Company affiliation date is required"],
    ["position", "Position is required"],
    ["salary", "Salary is required"],
];

for entry in required {
    if util.is_blank(context[entry[0]]) {
        outcomes.error(entry[1]);
        break;
    }
}
"#,
    },
    SeedRule {
        id: "DATE_FORMATS",
        rule_set: "validation",
        position: 20,
        body: r#"
if !util.is_valid_date(context.date_of_birth) {
    outcomes.error("Date of birth has an invalid format");
} else if !util.is_valid_date(context.date_affiliation_company) {
    outcomes.error("Company affiliation date has an invalid format");
}
"#,
    },
    SeedRule {
        id: "KNOWN_DOCUMENT_TYPE",
        rule_set: "validation",
        position: 30,
        body: r#"
let found = query_one(
    "SELECT code FROM document_type WHERE code = ? OR upper(description) = ?",
    [context.document_type, context.document_type]
);
if type_of(found) == "()" {
    outcomes.error("Document type " + context.document_type + " is not recognised");
} else {
    context.document_type = found.code;
}
"#,
    },
    SeedRule {
        id: "KNOWN_POSITION",
        rule_set: "validation",
        position: 40,
        body: r#"
let found = query_one(
    "SELECT code FROM job_position WHERE code = ? OR upper(description) = ?",
    [context.position, context.position]
);
if type_of(found) == "()" {
    outcomes.error("Position " + context.position + " is not recognised");
} else {
    context.position = found.code;
}
"#,
    },
    SeedRule {
        id: "ADULT_EMPLOYEE",
        rule_set: "validation",
        position: 50,
        body: r#"
if util.years_since(context.date_of_birth) < 18 {
    outcomes.error("The employee must be of legal age");
}
"#,
    },
    SeedRule {
        id: "AFFILIATION_AFTER_BIRTH",
        rule_set: "validation",
        position: 60,
        body: r#"
if util.days_between(context.date_of_birth, context.date_affiliation_company) < 0 {
    outcomes.error("Company affiliation date cannot precede the date of birth");
}
"#,
    },
    SeedRule {
        id: "CAST_CONTENT_EMAIL",
        rule_set: "notification",
        position: 10,
        body: r#"
let body = template;
body.replace("{names}", context.names);
body.replace("{last_names}", context.last_names);
body.replace("{document_type}", context.document_type);
body.replace("{document_number}", context.document_number);
body.replace("{position}", context.position);
body
"#,
    },
    SeedRule {
        id: "CAST_CONTENT_EMAIL_UPDATE",
        rule_set: "notification",
        position: 20,
        body: r#"
let body = template;
body.replace("{names}", context.names);
body.replace("{last_names}", context.last_names);
body.replace("{document_type}", context.document_type);
body.replace("{document_number}", context.document_number);
body
"#,
    },
];

pub const DEFAULT_PARAMETERS: &[(&str, &str)] = &[
    ("EMAIL_SUBJECT", "Welcome aboard"),
    (
        "EMAIL_CONTENT",
        "<p>Hello {names} {last_names},</p><p>Your registration as {position} with document {document_type} {document_number} is complete.</p>",
    ),
    ("EMAIL_COPY", ""),
    ("EMAIL_SEND_ATTACHMENT", "1"),
    ("SEND_EMAIL_WITH_COPY", "0"),
    ("SEND_EMAIL_WITH_BLIND_COPY", "0"),
    ("BLIND_COPY_EMAILS", ""),
    ("EMAIL_SUBJECT_UPDATE", "Your employee information was updated"),
    (
        "EMAIL_CONTENT_UPDATE",
        "<p>Hello {names} {last_names},</p><p>The information registered for document {document_type} {document_number} was updated.</p>",
    ),
    ("EMAIL_COPY_UPDATE", ""),
    ("EMAIL_SEND_ATTACHMENT_UPDATE", "0"),
    ("SEND_EMAIL_WITH_COPY_UPDATE", "0"),
    ("SEND_EMAIL_WITH_BLIND_COPY_UPDATE", "0"),
    ("BLIND_COPY_EMAILS_UPDATE", ""),
    ("UPDATE_INFORMATION", "1"),
    ("GET_REPORT_EMPLOYEE", "1"),
];
