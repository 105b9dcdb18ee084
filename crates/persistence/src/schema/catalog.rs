//! Built-in resource definitions.

use super::{RelationDef, ResourceDefinition, SearchParamDef, SearchParamType};

use super::SearchParamType::{Date, Number, Reference, String as Str, Token};

const fn param(
    code: &'static str,
    param_type: SearchParamType,
    paths: &'static [&'static str],
) -> SearchParamDef {
    SearchParamDef {
        code,
        param_type,
        paths,
    }
}

const fn relation(
    name: &'static str,
    path: &'static str,
    targets: &'static [&'static str],
) -> RelationDef {
    RelationDef {
        name,
        path,
        targets,
    }
}

static PATIENT: ResourceDefinition = ResourceDefinition {
    name: "Patient",
    required: &[],
    search_params: &[
        param("name", Str, &["name.family", "name.given", "name.text"]),
        param("family", Str, &["name.family"]),
        param("given", Str, &["name.given"]),
        param("gender", Token, &["gender"]),
        param("birthdate", Date, &["birthDate"]),
        param("identifier", Token, &["identifier.value"]),
        param("active", Token, &["active"]),
        param("organization", Reference, &["managingOrganization.reference"]),
        param(
            "general-practitioner",
            Reference,
            &["generalPractitioner.reference"],
        ),
    ],
    relations: &[
        relation("managingOrganization", "managingOrganization", &["Organization"]),
        relation(
            "generalPractitioner",
            "generalPractitioner",
            &["Practitioner", "Organization"],
        ),
    ],
};

static PRACTITIONER: ResourceDefinition = ResourceDefinition {
    name: "Practitioner",
    required: &[],
    search_params: &[
        param("name", Str, &["name.family", "name.given", "name.text"]),
        param("family", Str, &["name.family"]),
        param("given", Str, &["name.given"]),
        param("gender", Token, &["gender"]),
        param("identifier", Token, &["identifier.value"]),
        param("active", Token, &["active"]),
    ],
    relations: &[],
};

static ORGANIZATION: ResourceDefinition = ResourceDefinition {
    name: "Organization",
    required: &[],
    search_params: &[
        param("name", Str, &["name", "alias"]),
        param("identifier", Token, &["identifier.value"]),
        param("active", Token, &["active"]),
        param("partof", Reference, &["partOf.reference"]),
    ],
    relations: &[relation("partOf", "partOf", &["Organization"])],
};

static ENCOUNTER: ResourceDefinition = ResourceDefinition {
    name: "Encounter",
    required: &["status"],
    search_params: &[
        param("status", Token, &["status"]),
        param("class", Token, &["class.code"]),
        param("date", Date, &["period.start"]),
        param("subject", Reference, &["subject.reference"]),
        param("patient", Reference, &["subject.reference"]),
        param(
            "participant",
            Reference,
            &["participant.individual.reference"],
        ),
    ],
    relations: &[
        relation("subject", "subject", &["Patient"]),
        relation("serviceProvider", "serviceProvider", &["Organization"]),
    ],
};

static OBSERVATION: ResourceDefinition = ResourceDefinition {
    name: "Observation",
    required: &["status", "code"],
    search_params: &[
        param("status", Token, &["status"]),
        param("code", Token, &["code.coding.code"]),
        param("date", Date, &["effectiveDateTime", "issued"]),
        param("subject", Reference, &["subject.reference"]),
        param("patient", Reference, &["subject.reference"]),
        param("encounter", Reference, &["context.reference"]),
        param("performer", Reference, &["performer.reference"]),
        param("value-quantity", Number, &["valueQuantity.value"]),
    ],
    relations: &[
        relation("subject", "subject", &["Patient"]),
        relation("context", "context", &["Encounter"]),
        relation(
            "performer",
            "performer",
            &["Practitioner", "Organization", "Patient"],
        ),
    ],
};

static CONDITION: ResourceDefinition = ResourceDefinition {
    name: "Condition",
    required: &["subject"],
    search_params: &[
        param("code", Token, &["code.coding.code"]),
        param("clinical-status", Token, &["clinicalStatus"]),
        param("onset-date", Date, &["onsetDateTime"]),
        param("subject", Reference, &["subject.reference"]),
        param("patient", Reference, &["subject.reference"]),
        param("encounter", Reference, &["context.reference"]),
    ],
    relations: &[
        relation("subject", "subject", &["Patient"]),
        relation("context", "context", &["Encounter"]),
        relation("asserter", "asserter", &["Practitioner", "Patient"]),
    ],
};

static PROCEDURE_REQUEST: ResourceDefinition = ResourceDefinition {
    name: "ProcedureRequest",
    required: &["status", "intent", "subject"],
    search_params: &[
        param("status", Token, &["status"]),
        param("intent", Token, &["intent"]),
        param("code", Token, &["code.coding.code"]),
        param("authored", Date, &["authoredOn"]),
        param("subject", Reference, &["subject.reference"]),
        param("patient", Reference, &["subject.reference"]),
        param("encounter", Reference, &["context.reference"]),
        param("requester", Reference, &["requester.agent.reference"]),
        param("performer", Reference, &["performer.reference"]),
    ],
    relations: &[
        relation("subject", "subject", &["Patient"]),
        relation("context", "context", &["Encounter"]),
        relation(
            "requester",
            "requester.agent",
            &["Practitioner", "Organization", "Patient"],
        ),
        relation("performer", "performer", &["Practitioner", "Organization"]),
    ],
};

/// Every resource type this build knows about.
pub static CATALOG: &[&ResourceDefinition] = &[
    &PATIENT,
    &PRACTITIONER,
    &ORGANIZATION,
    &ENCOUNTER,
    &OBSERVATION,
    &CONDITION,
    &PROCEDURE_REQUEST,
];

/// Looks up a resource definition by its exact, case-sensitive name.
pub fn definition(resource_type: &str) -> Option<&'static ResourceDefinition> {
    CATALOG.iter().copied().find(|d| d.name == resource_type)
}

/// Returns the names of all known resource types.
pub fn resource_types() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|d| d.name)
}
