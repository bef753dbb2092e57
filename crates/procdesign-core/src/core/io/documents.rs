use super::traits::InputDocument;
use crate::core::models::error::ModelError;
use crate::core::models::material::{RawMaterial, validate_materials};
use crate::core::models::specification::{ProductSpecification, validate_specifications};
use serde::{Deserialize, Serialize};

/// Accepts both `{"<key>": [...]}` and a bare top-level array.
#[derive(Deserialize)]
#[serde(untagged)]
enum MaterialsRepr {
    Wrapped { materials: Vec<RawMaterial> },
    Bare(Vec<RawMaterial>),
}

impl From<MaterialsRepr> for MaterialsDocument {
    fn from(repr: MaterialsRepr) -> Self {
        let materials = match repr {
            MaterialsRepr::Wrapped { materials } => materials,
            MaterialsRepr::Bare(materials) => materials,
        };
        Self { materials }
    }
}

/// The raw-materials input document.
///
/// TOML has no top-level arrays, so TOML documents use the wrapped form:
///
/// ```toml
/// [[materials]]
/// name = "Ethylene"
/// chemical_formula = "C2H4"
/// amount = 100.0
/// units = "kg/hr"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MaterialsRepr")]
pub struct MaterialsDocument {
    pub materials: Vec<RawMaterial>,
}

impl InputDocument for MaterialsDocument {
    fn validate(&self) -> Result<(), ModelError> {
        validate_materials(&self.materials)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpecificationsRepr {
    Wrapped {
        specifications: Vec<ProductSpecification>,
    },
    Bare(Vec<ProductSpecification>),
}

impl From<SpecificationsRepr> for SpecificationsDocument {
    fn from(repr: SpecificationsRepr) -> Self {
        let specifications = match repr {
            SpecificationsRepr::Wrapped { specifications } => specifications,
            SpecificationsRepr::Bare(specifications) => specifications,
        };
        Self { specifications }
    }
}

/// The product-specifications input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SpecificationsRepr")]
pub struct SpecificationsDocument {
    pub specifications: Vec<ProductSpecification>,
}

impl InputDocument for SpecificationsDocument {
    fn validate(&self) -> Result<(), ModelError> {
        validate_specifications(&self.specifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::traits::{DocumentError, DocumentFormat};
    use crate::core::models::material::PhysicalState;
    use std::fs;
    use tempfile::TempDir;

    const MATERIALS_JSON: &str = r#"[
        {"name": "Ethylene", "chemical_formula": "C2H4", "cas_number": "74-85-1",
         "amount": 100.0, "units": "kg/hr", "state": "gas"},
        {"name": "Water", "chemical_formula": "H2O", "amount": 200.0, "units": "kg/hr",
         "state": "liquid", "temperature": 298.15, "pressure": 101325.0}
    ]"#;

    const SPECIFICATIONS_TOML: &str = r#"
        [[specifications]]
        name = "Ethanol"
        chemical_formula = "C2H6O"
        cas_number = "64-17-5"
        purity = 0.95
        yield = 0.85
        state = "liquid"
        temperature_range = { min = 298.15, max = 353.15 }
        pressure_range = { min = 101325.0, max = 202650.0 }

        [specifications.properties]
        density = { min = 780.0, max = 800.0 }
        grade = "fuel"
    "#;

    #[test]
    fn reads_bare_json_array_of_materials() {
        let doc = MaterialsDocument::read_from(
            &mut MATERIALS_JSON.as_bytes(),
            DocumentFormat::Json,
            "materials.json",
        )
        .unwrap();
        assert_eq!(doc.materials.len(), 2);
        assert_eq!(doc.materials[0].state, Some(PhysicalState::Gas));
        assert_eq!(doc.materials[1].feed_pressure(), 101_325.0);
    }

    #[test]
    fn reads_wrapped_json_materials() {
        let wrapped = format!(r#"{{"materials": {}}}"#, MATERIALS_JSON);
        let doc = MaterialsDocument::read_from(
            &mut wrapped.as_bytes(),
            DocumentFormat::Json,
            "materials.json",
        )
        .unwrap();
        assert_eq!(doc.materials[0].name, "Ethylene");
    }

    #[test]
    fn reads_toml_specifications_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("specs.toml");
        fs::write(&path, SPECIFICATIONS_TOML).unwrap();

        let doc = SpecificationsDocument::read_from_path(&path).unwrap();
        let ethanol = &doc.specifications[0];
        assert_eq!(ethanol.yield_requirement, Some(0.85));
        assert_eq!(ethanol.temperature_range.unwrap().max, Some(353.15));
        assert_eq!(ethanol.properties.len(), 2);
    }

    #[test]
    fn validation_failures_carry_the_document_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("specs.json");
        fs::write(&path, r#"[{"name": "Mystery", "purity": 0.9}]"#).unwrap();

        let err = SpecificationsDocument::read_from_path(&path).unwrap_err();
        match err {
            DocumentError::Invalid { path: p, source } => {
                assert!(p.ends_with("specs.json"));
                assert!(matches!(source, ModelError::MissingIdentity { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_documents_are_rejected() {
        let err = MaterialsDocument::read_from(&mut "[]".as_bytes(), DocumentFormat::Json, "m")
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Invalid {
                source: ModelError::EmptyDocument("materials"),
                ..
            }
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err =
            MaterialsDocument::read_from(&mut "{not json".as_bytes(), DocumentFormat::Json, "m")
                .unwrap_err();
        assert!(matches!(err, DocumentError::Json { .. }));
    }
}
