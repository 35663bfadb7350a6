//! Decoding of IHE SVS `RetrieveMultipleValueSetsResponse` documents
//!
//! Elements are matched by local name so that both the `ns0:` prefixed form
//! VSAC emits and unprefixed documents decode the same way.

use crate::error::Result;
use crate::models::{SvsConcept, SvsValueSet};
use roxmltree::{Document, Node};

/// Decode every `DescribedValueSet` in an SVS response body.
pub fn parse_value_sets(xml: &str) -> Result<Vec<SvsValueSet>> {
    let doc = Document::parse(xml)?;

    let value_sets = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "DescribedValueSet")
        .map(parse_described_value_set)
        .collect();

    Ok(value_sets)
}

fn parse_described_value_set(node: Node) -> SvsValueSet {
    let mut value_set = SvsValueSet {
        id: node.attribute("ID").unwrap_or_default().to_string(),
        display_name: node.attribute("displayName").map(str::to_string),
        version: node.attribute("version").map(str::to_string),
        ..Default::default()
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "ConceptList" => {
                value_set.concepts = child
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "Concept")
                    .filter_map(parse_concept)
                    .collect();
            }
            "Source" => value_set.source = element_text(child),
            "Purpose" => value_set.purpose = element_text(child),
            "Type" => value_set.value_set_type = element_text(child),
            "Binding" => value_set.binding = element_text(child),
            "Status" => value_set.status = element_text(child),
            "RevisionDate" => value_set.revision_date = element_text(child),
            _ => {}
        }
    }

    value_set
}

fn parse_concept(node: Node) -> Option<SvsConcept> {
    // A concept without a code carries nothing worth grouping.
    let code = node.attribute("code")?;
    Some(SvsConcept {
        code: code.to_string(),
        code_system: node.attribute("codeSystem").unwrap_or_default().to_string(),
        code_system_name: node.attribute("codeSystemName").map(str::to_string),
        code_system_version: node.attribute("codeSystemVersion").map(str::to_string),
        display_name: node.attribute("displayName").map(str::to_string),
    })
}

fn element_text(node: Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFICE_VISIT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ns0:RetrieveMultipleValueSetsResponse xmlns:ns0="urn:ihe:iti:svs:2008" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <ns0:DescribedValueSet ID="2.16.840.1.113883.3.464.1003.101.12.1001" displayName="Office Visit" version="20230301">
    <ns0:ConceptList>
      <ns0:Concept code="185463005" codeSystemName="SNOMEDCT" codeSystemVersion="2023-03" codeSystem="2.16.840.1.113883.6.96" displayName="Visit out of hours (procedure)"/>
      <ns0:Concept code="99202" codeSystemName="CPT" codeSystemVersion="2023" codeSystem="2.16.840.1.113883.6.12" displayName="Office or other outpatient visit"/>
    </ns0:ConceptList>
    <ns0:Source>National Committee for Quality Assurance</ns0:Source>
    <ns0:Purpose></ns0:Purpose>
    <ns0:Type>Extensional</ns0:Type>
    <ns0:Binding>Dynamic</ns0:Binding>
    <ns0:Status>Active</ns0:Status>
    <ns0:RevisionDate>2023-03-01</ns0:RevisionDate>
  </ns0:DescribedValueSet>
</ns0:RetrieveMultipleValueSetsResponse>"#;

    #[test]
    fn test_parse_described_value_set() {
        let value_sets = parse_value_sets(OFFICE_VISIT).unwrap();
        assert_eq!(value_sets.len(), 1);

        let vs = &value_sets[0];
        assert_eq!(vs.id, "2.16.840.1.113883.3.464.1003.101.12.1001");
        assert_eq!(vs.display_name.as_deref(), Some("Office Visit"));
        assert_eq!(vs.version.as_deref(), Some("20230301"));
        assert_eq!(
            vs.source.as_deref(),
            Some("National Committee for Quality Assurance")
        );
        assert_eq!(vs.purpose, None);
        assert_eq!(vs.binding.as_deref(), Some("Dynamic"));
        assert_eq!(vs.revision_date.as_deref(), Some("2023-03-01"));

        assert_eq!(vs.concepts.len(), 2);
        assert_eq!(vs.concepts[0].code, "185463005");
        assert_eq!(vs.concepts[0].code_system, "2.16.840.1.113883.6.96");
        assert_eq!(vs.concepts[0].code_system_version.as_deref(), Some("2023-03"));
        assert_eq!(
            vs.concepts[1].display_name.as_deref(),
            Some("Office or other outpatient visit")
        );
    }

    #[test]
    fn test_parse_unprefixed_and_empty_concept_list() {
        let xml = r#"<RetrieveMultipleValueSetsResponse>
            <DescribedValueSet ID="1.2.3" displayName="Empty">
                <ConceptList/>
            </DescribedValueSet>
        </RetrieveMultipleValueSetsResponse>"#;

        let value_sets = parse_value_sets(xml).unwrap();
        assert_eq!(value_sets.len(), 1);
        assert!(value_sets[0].concepts.is_empty());
        assert_eq!(value_sets[0].version, None);
    }

    #[test]
    fn test_concept_without_code_is_skipped() {
        let xml = r#"<DescribedValueSet ID="1.2.3"><ConceptList>
            <Concept codeSystem="2.16.840.1.113883.6.1" displayName="no code"/>
            <Concept code="1234-5" codeSystem="2.16.840.1.113883.6.1"/>
        </ConceptList></DescribedValueSet>"#;

        let value_sets = parse_value_sets(xml).unwrap();
        assert_eq!(value_sets[0].concepts.len(), 1);
        assert_eq!(value_sets[0].concepts[0].code, "1234-5");
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(parse_value_sets("<DescribedValueSet ID=").is_err());
    }
}
