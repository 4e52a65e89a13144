//! Data API query tools.

use crate::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use brcmcp_api::{DataClient, QueryOptions};
use serde_json::{json, Value};

/// Query a Solr collection with a filter expression.
pub struct QueryCollectionTool {
    data: DataClient,
}

impl QueryCollectionTool {
    pub fn new(data: DataClient) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for QueryCollectionTool {
    fn id(&self) -> &str {
        "query_collection"
    }

    fn description(&self) -> &str {
        "Query a BV-BRC Solr collection. Takes a collection name and an \
         optional Solr filter expression; returns matching documents as JSON."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "collection": {
                    "type": "string",
                    "description": "Collection name, e.g. 'genome' or 'genome_feature'"
                },
                "filter": {
                    "type": "string",
                    "description": "Solr filter expression; empty matches everything"
                },
                "select": {
                    "type": "string",
                    "description": "Comma-separated list of fields to return"
                },
                "sort": {
                    "type": "string",
                    "description": "Sort clause, e.g. 'genome_name asc'"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of documents to return"
                },
                "count_only": {
                    "type": "boolean",
                    "description": "Return only the match count, no documents"
                },
                "token": {"type": "string", "description": "BV-BRC auth token"}
            },
            "required": ["collection"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String> {
        // Resolve the credential before touching the network; a missing
        // credential must not produce an outbound call.
        let credential = ctx.credential_with(&args)?;

        let collection = args["collection"].as_str().unwrap_or_default();
        let filter = args.get("filter").and_then(Value::as_str).unwrap_or("");
        let count_only = args
            .get("count_only")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let options = QueryOptions {
            limit: if count_only {
                Some(0)
            } else {
                args.get("limit").and_then(Value::as_u64).map(|n| n as u32)
            },
            fields: args
                .get("select")
                .and_then(Value::as_str)
                .map(str::to_string),
            sort: args.get("sort").and_then(Value::as_str).map(str::to_string),
        };

        let page = self
            .data
            .query(collection, filter, &options, Some(credential.secret()))
            .await?;

        let body = if count_only {
            json!({"collection": collection, "count": page.num_found})
        } else {
            json!({
                "collection": collection,
                "count": page.num_found,
                "returned": page.docs.len(),
                "docs": page.docs,
            })
        };
        Ok(serde_json::to_string_pretty(&body)?)
    }
}

/// Static catalog of the queryable Solr collections.
pub struct SolrCollectionsTool;

#[async_trait]
impl Tool for SolrCollectionsTool {
    fn id(&self) -> &str {
        "solr_collections"
    }

    fn description(&self) -> &str {
        "List the BV-BRC Solr collections available to query_collection"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> ToolResult<String> {
        Ok(COLLECTIONS.to_string())
    }
}

const COLLECTIONS: &str = "\
Available Solr Collections:
1. genome - Complete bacterial and viral genome assemblies with metadata including taxonomy, quality metrics, geographic location, and antimicrobial resistance data.
2. genome_feature - Individual genes, proteins, and functional elements within genomes, including annotations and functional classifications.
3. genome_sequence - Raw DNA/RNA sequence data for genomes and individual sequences with accession numbers and sequence metadata.
4. antibiotics - Antimicrobial compounds with chemical properties, mechanisms of action, and pharmacological classifications.
5. bioset_result - Experimental results from gene expression, proteomics, and other high-throughput studies.
6. bioset - Experimental datasets and study designs including treatment conditions and analysis protocols.
7. strain - Viral strain information with genetic segments, host data, and epidemiological metadata.
8. surveillance - Clinical surveillance data including patient demographics, disease status, and treatment outcomes.
9. experiment - Experimental metadata including study design, protocols, and experimental conditions.
10. taxonomy - Taxonomic classification data with hierarchical relationships and nomenclature.
11. pathway - Biological pathway information including metabolic and signaling pathways.
12. protein_structure - Protein structural data including 3D coordinates and structural classifications.
13. epitope - Antigenic epitope data for vaccine and immunology research.
14. serology - Serological test results and antibody response data.
15. genome_amr - Antimicrobial resistance data linked to specific genomes and resistance mechanisms.
16. sequence_feature - Sequence variants and mutations with functional annotations.
17. protein_feature - Protein domain and functional feature annotations.
18. subsystem - Functional subsystem classifications for metabolic and cellular processes.
19. ppi - Protein-protein interaction data.
20. spike_variant - SARS-CoV-2 spike protein variant information.
21. spike_lineage - SARS-CoV-2 lineage and variant classifications.
22. structured_assertion - Curated functional assertions and annotations.
23. misc_niaid_sgc - Miscellaneous NIAID Single Cell Genomics data.
24. enzyme_class_ref - Enzyme classification reference data.
25. epitope_assay - Epitope binding assay results.
26. gene_ontology_ref - Gene Ontology reference classifications.
27. id_ref - Identifier reference mappings.
28. pathway_ref - Pathway reference data.
29. protein_family_ref - Protein family reference classifications.
30. sp_gene_ref - Specialized gene reference data.
31. sp_gene - Specialized gene data.
32. subsystem_ref - Subsystem reference classifications.
33. sequence_feature_vt - Sequence feature variant type data.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_with_token, context_without_token};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn data_client(uri: &str) -> DataClient {
        let http = brcmcp_api::http_client(std::time::Duration::from_secs(2)).unwrap();
        DataClient::new(http, uri)
    }

    #[tokio::test]
    async fn test_no_credential_means_no_outbound_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tool = QueryCollectionTool::new(data_client(&server.uri()));
        let ctx = context_without_token();
        let err = tool
            .execute(json!({"collection": "genome"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no credential"));
        // mock verification on drop asserts zero requests
    }

    #[tokio::test]
    async fn test_query_returns_docs_and_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 1, "docs": [{"genome_id": "83333.111"}]},
                "nextCursorMark": "*"
            })))
            .mount(&server)
            .await;

        let tool = QueryCollectionTool::new(data_client(&server.uri()));
        let ctx = context_with_token("un=alice|sig=x");
        let out = tool
            .execute(
                json!({"collection": "genome", "filter": "genome_id:83333.111"}),
                &ctx,
            )
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["docs"][0]["genome_id"], "83333.111");
    }

    #[tokio::test]
    async fn test_count_only_omits_docs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 42, "docs": []},
                "nextCursorMark": "*"
            })))
            .mount(&server)
            .await;

        let tool = QueryCollectionTool::new(data_client(&server.uri()));
        let ctx = context_with_token("un=alice|sig=x");
        let out = tool
            .execute(json!({"collection": "genome", "count_only": true}), &ctx)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["count"], 42);
        assert!(parsed.get("docs").is_none());
    }

    #[tokio::test]
    async fn test_collection_catalog_is_static() {
        let ctx = context_without_token();
        let out = SolrCollectionsTool.execute(json!({}), &ctx).await.unwrap();
        assert!(out.contains("genome_feature"));
        assert!(out.contains("sp_gene"));
    }
}
