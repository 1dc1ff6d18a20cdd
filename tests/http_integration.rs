//! Integration tests for table scans using wiremock
//!
//! Every service endpoint is overridden to point at a mock server, so these
//! tests exercise signing, request encoding, response decoding, pagination
//! and row enrichment end to end.

use aws_credential_types::Credentials;
use awsql::aws::client::{AwsClient, ClientOptions};
use awsql::aws::http::format_aws_error;
use awsql::query::{
    execute, CollectSink, ListOutcome, Operator, Qual, QualValue, QueryRequest,
};
use awsql::QueryError;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CALLER_ACCOUNT: &str = "123456789012";

async fn client(server: &MockServer, region: &str) -> AwsClient {
    AwsClient::new(ClientOptions {
        region: region.to_string(),
        endpoint_url: Some(server.uri()),
        credentials: Some(Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            None,
            None,
            "test",
        )),
        ..Default::default()
    })
    .await
    .expect("client should build")
}

fn eq(column: &str, value: &str) -> Qual {
    Qual::new(column, Operator::Eq, QualValue::String(value.to_string()))
}

fn request(table: &str, columns: &[&str], quals: Vec<Qual>, limit: Option<usize>) -> QueryRequest {
    QueryRequest {
        table: table.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        quals,
        limit,
    }
}

fn xml(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/xml")
}

fn caller_identity_xml() -> String {
    format!(
        r#"<GetCallerIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <GetCallerIdentityResult>
    <Arn>arn:aws:iam::{0}:user/alice</Arn>
    <UserId>AIDAEXAMPLE</UserId>
    <Account>{0}</Account>
  </GetCallerIdentityResult>
  <ResponseMetadata><RequestId>req-sts</RequestId></ResponseMetadata>
</GetCallerIdentityResponse>"#,
        CALLER_ACCOUNT
    )
}

fn images_xml(images: &[(&str, &str, Option<&str>)], next_token: Option<&str>) -> String {
    let items: String = images
        .iter()
        .map(|(id, owner, alias)| {
            let alias = alias
                .map(|a| format!("<imageOwnerAlias>{}</imageOwnerAlias>", a))
                .unwrap_or_default();
            format!(
                "<item><imageId>{}</imageId><imageOwnerId>{}</imageOwnerId>{}\
                 <imageState>available</imageState><architecture>arm64</architecture>\
                 <isPublic>true</isPublic><name>{}-name</name></item>",
                id, owner, alias, id
            )
        })
        .collect();
    let token = next_token
        .map(|t| format!("<nextToken>{}</nextToken>", t))
        .unwrap_or_default();
    format!(
        r#"<DescribeImagesResponse xmlns="http://ec2.amazonaws.com/doc/2016-11-15/"><requestId>req-ec2</requestId><imagesSet>{}</imagesSet>{}</DescribeImagesResponse>"#,
        items, token
    )
}

async fn mount_caller_identity(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("Action=GetCallerIdentity"))
        .respond_with(xml(&caller_identity_xml()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Resource Explorer supported resource types
mod resource_explorer_tests {
    use super::*;

    const TABLE: &str = "aws_resource_explorer_supported_resource_type";

    #[tokio::test]
    async fn test_multi_page_listing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ListSupportedResourceTypes"))
            .and(header_exists("authorization"))
            .and(body_json(json!({"MaxResults": 100})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResourceTypes": [
                    {"ResourceType": "ec2:instance", "Service": "ec2"},
                    {"ResourceType": "ec2:image", "Service": "ec2"}
                ],
                "NextToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/ListSupportedResourceTypes"))
            .and(body_json(json!({"MaxResults": 100, "NextToken": "page-2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResourceTypes": [
                    {"ResourceType": "s3:bucket", "Service": "s3"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        let summary = execute(
            &client,
            &request(TABLE, &["resource_type", "service", "region"], vec![], None),
            &mut sink,
        )
        .await
        .expect("scan should succeed");

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.outcome, ListOutcome::Done);

        let rows = sink.into_rows();
        assert_eq!(rows[0].get("resource_type"), Some(&json!("ec2:instance")));
        assert_eq!(rows[2].get("service"), Some(&json!("s3")));
        assert_eq!(rows[2].get("region"), Some(&json!("us-east-1")));
    }

    #[tokio::test]
    async fn test_limit_stops_after_first_page() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ListSupportedResourceTypes"))
            .and(body_json(json!({"MaxResults": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResourceTypes": [
                    {"ResourceType": "ec2:instance", "Service": "ec2"},
                    {"ResourceType": "ec2:image", "Service": "ec2"}
                ],
                "NextToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        let summary = execute(&client, &request(TABLE, &["service"], vec![], Some(2)), &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.outcome, ListOutcome::StoppedEarly);
        assert_eq!(sink.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_region_returns_no_rows() {
        let server = MockServer::start().await;
        let client = client(&server, "eu-central-2").await;

        let mut sink = CollectSink::new();
        let summary = execute(&client, &request(TABLE, &["service"], vec![], None), &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.rows, 0);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ListSupportedResourceTypes"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-amzn-ErrorType", "AccessDeniedException:http://internal")
                    .set_body_json(json!({"message": "not authorized"})),
            )
            .mount(&server)
            .await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        let err = execute(&client, &request(TABLE, &["service"], vec![], None), &mut sink)
            .await
            .unwrap_err();

        assert_eq!(err.api_code(), Some("AccessDeniedException"));
        assert_eq!(err.status(), Some(403));
        assert!(format_aws_error(&err).starts_with("Permission denied"));
    }
}

/// EC2 AMI tables
mod ami_tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_listing_encodes_owner_and_filters() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("Action=DescribeImages"))
            .and(body_string_contains("Owner.1=137112412989"))
            .and(body_string_contains("Filter.1.Name=architecture"))
            .and(body_string_contains("Filter.1.Value.1=arm64"))
            .and(body_string_contains("MaxResults=1000"))
            .respond_with(xml(&images_xml(
                &[
                    ("ami-1", "137112412989", Some("amazon")),
                    ("ami-2", "137112412989", None),
                ],
                None,
            )))
            .expect(1)
            .mount(&server)
            .await;
        mount_caller_identity(&server, 1).await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        let summary = execute(
            &client,
            &request(
                "aws_ec2_ami_shared",
                &["image_id", "image_owner_alias", "akas"],
                vec![eq("owner_id", "137112412989"), eq("architecture", "arm64")],
                None,
            ),
            &mut sink,
        )
        .await
        .expect("scan should succeed");

        assert_eq!(summary.rows, 2);
        let rows = sink.into_rows();
        assert_eq!(rows[0].get("image_owner_alias"), Some(&json!("amazon")));
        assert_eq!(rows[1].get("image_owner_alias"), Some(&json!("137112412989")));
        assert_eq!(
            rows[1].get("akas"),
            Some(&json!(["arn:aws:ec2:us-east-1:137112412989:image/ami-2"]))
        );
    }

    #[tokio::test]
    async fn test_shared_listing_requires_owner() {
        let server = MockServer::start().await;
        let client = client(&server, "us-east-1").await;

        let mut sink = CollectSink::new();
        let err = execute(
            &client,
            &request("aws_ec2_ami_shared", &[], vec![eq("name", "web")], None),
            &mut sink,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            QueryError::MissingKeyColumn { ref column, .. } if column == "owner_id"
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owned_listing_scopes_to_caller_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("Action=DescribeImages"))
            .and(body_string_contains("Owner.1=self"))
            .and(body_string_contains("Filter.1.Name=owner-id"))
            .and(body_string_contains(&format!("Filter.1.Value.1={}", CALLER_ACCOUNT)))
            .respond_with(xml(&images_xml(&[("ami-own", CALLER_ACCOUNT, None)], None)))
            .expect(1)
            .mount(&server)
            .await;
        // Needed by both the owner filter and the enriched columns
        mount_caller_identity(&server, 1).await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        execute(
            &client,
            &request(
                "aws_ec2_ami",
                &["image_id", "image_owner_alias", "account_id", "partition"],
                vec![],
                None,
            ),
            &mut sink,
        )
        .await
        .unwrap();

        let rows = sink.into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("image_owner_alias"), Some(&json!("self")));
        assert_eq!(rows[0].get("account_id"), Some(&json!(CALLER_ACCOUNT)));
        assert_eq!(rows[0].get("partition"), Some(&json!("aws")));
    }

    #[tokio::test]
    async fn test_pagination_follows_next_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("NextToken=tok-2"))
            .respond_with(xml(&images_xml(&[("ami-3", "111111111111", None)], None)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("Action=DescribeImages"))
            .respond_with(xml(&images_xml(
                &[("ami-1", "111111111111", None), ("ami-2", "111111111111", None)],
                Some("tok-2"),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        let summary = execute(
            &client,
            &request(
                "aws_ec2_ami_shared",
                &["image_id"],
                vec![eq("owner_id", "111111111111")],
                None,
            ),
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(summary.pages, 2);
        let ids: Vec<_> = sink
            .rows
            .iter()
            .map(|r| r.get("image_id").cloned().unwrap())
            .collect();
        assert_eq!(ids, vec![json!("ami-1"), json!("ami-2"), json!("ami-3")]);
    }

    #[tokio::test]
    async fn test_get_not_found_is_empty_result() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("ImageId.1=ami-missing"))
            .respond_with(ResponseTemplate::new(400).set_body_raw(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Response><Errors><Error><Code>InvalidAMIID.NotFound</Code><Message>The image id '[ami-missing]' does not exist</Message></Error></Errors><RequestID>req-1</RequestID></Response>"#,
                "text/xml",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        let summary = execute(
            &client,
            &request(
                "aws_ec2_ami_shared",
                &["image_id"],
                vec![eq("image_id", "ami-missing")],
                None,
            ),
            &mut sink,
        )
        .await
        .expect("not found should not fail the query");

        assert_eq!(summary.rows, 0);
        assert_eq!(summary.ignored_error.as_deref(), Some("InvalidAMIID.NotFound"));
    }

    fn expired_token_xml() -> ResponseTemplate {
        ResponseTemplate::new(403).set_body_raw(
            r#"<ErrorResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/"><Error><Type>Sender</Type><Code>ExpiredToken</Code><Message>The security token included in the request is expired</Message></Error><RequestId>req-sts</RequestId></ErrorResponse>"#,
            "text/xml",
        )
    }

    async fn mount_expired_caller_identity(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("Action=GetCallerIdentity"))
            .respond_with(expired_token_xml())
            .expect(1)
            .mount(server)
            .await;
    }

    async fn request_bodies(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_get_with_zero_limit_sends_nothing() {
        let server = MockServer::start().await;
        let client = client(&server, "us-east-1").await;

        let mut sink = CollectSink::new();
        let summary = execute(
            &client,
            &request(
                "aws_ec2_ami_shared",
                &["image_id", "akas"],
                vec![eq("image_id", "ami-1")],
                Some(0),
            ),
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(summary.rows, 0);
        assert_eq!(summary.outcome, ListOutcome::StoppedEarly);
        assert!(sink.rows.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owned_listing_with_zero_limit_skips_identity() {
        let server = MockServer::start().await;
        let client = client(&server, "us-east-1").await;

        let mut sink = CollectSink::new();
        let summary = execute(
            &client,
            &request("aws_ec2_ami", &["image_id", "akas", "account_id"], vec![], Some(0)),
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(summary.rows, 0);
        assert_eq!(summary.outcome, ListOutcome::StoppedEarly);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_failure_fails_enriched_query() {
        let server = MockServer::start().await;
        mount_expired_caller_identity(&server).await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        let err = execute(
            &client,
            &request(
                "aws_ec2_ami_shared",
                &["image_id", "image_owner_alias", "akas"],
                vec![eq("owner_id", "137112412989")],
                None,
            ),
            &mut sink,
        )
        .await
        .unwrap_err();

        match &err {
            QueryError::Identity(message) => assert!(message.contains("ExpiredToken")),
            other => panic!("expected identity error, got {:?}", other),
        }
        assert!(sink.rows.is_empty());
        // Nothing is listed once the identity is known to be unavailable
        let bodies = request_bodies(&server).await;
        assert!(!bodies.iter().any(|b| b.contains("Action=DescribeImages")));
    }

    #[tokio::test]
    async fn test_owned_listing_without_identity_columns_drops_owner_filter() {
        let server = MockServer::start().await;
        mount_expired_caller_identity(&server).await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("Action=DescribeImages"))
            .and(body_string_contains("Owner.1=self"))
            .respond_with(xml(&images_xml(&[("ami-own", CALLER_ACCOUNT, None)], None)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        let summary = execute(
            &client,
            &request("aws_ec2_ami", &["image_id", "name", "state"], vec![], None),
            &mut sink,
        )
        .await
        .expect("owner scope is optional");

        assert_eq!(summary.rows, 1);
        assert_eq!(sink.rows[0].get("image_id"), Some(&json!("ami-own")));

        let bodies = request_bodies(&server).await;
        let describe: Vec<_> = bodies
            .iter()
            .filter(|b| b.contains("Action=DescribeImages"))
            .collect();
        assert_eq!(describe.len(), 1);
        assert!(!describe[0].contains("Filter."));
        assert_eq!(
            bodies
                .iter()
                .filter(|b| b.contains("Action=GetCallerIdentity"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_predicates_rechecked_on_rows() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("Action=DescribeImages"))
            .respond_with(xml(&images_xml(
                &[("ami-1", "111111111111", None), ("ami-2", "111111111111", None)],
                None,
            )))
            .mount(&server)
            .await;

        let client = client(&server, "us-east-1").await;
        let mut sink = CollectSink::new();
        // title is not a key column; it is only checked against each row
        execute(
            &client,
            &request(
                "aws_ec2_ami_shared",
                &["image_id"],
                vec![eq("owner_id", "111111111111"), eq("title", "ami-2-name")],
                None,
            ),
            &mut sink,
        )
        .await
        .unwrap();

        assert_eq!(sink.rows.len(), 1);
        assert_eq!(sink.rows[0].get("image_id"), Some(&json!("ami-2")));
    }
}
