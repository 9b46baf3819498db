//! Shared test support utilities for integration tests

#![allow(dead_code)]

use cloudshift_core::{Engine, LanguageVariant, PatternCatalog, TransformRequest, TransformResult};

/// Bundled catalog, compiled
pub fn builtin_catalog() -> PatternCatalog {
    PatternCatalog::from_sources(cloudshift_providers::builtin_catalog_sources())
        .expect("bundled catalog compiles")
}

/// Engine over the bundled catalog with the default adapters
pub fn engine() -> Engine {
    Engine::new(builtin_catalog())
}

pub fn request(source: &str, language: LanguageVariant, target: &str) -> TransformRequest {
    TransformRequest::new(source, language, "aws", target)
}

/// Transform synchronously and panic on any request error
pub fn transform(source: &str, language: LanguageVariant, target: &str) -> TransformResult {
    engine()
        .transform_blocking(request(source, language, target))
        .unwrap_or_else(|e| panic!("transform failed: {}", e))
}

/// Rule ids of the applied hits, in document order
pub fn rule_ids(result: &TransformResult) -> Vec<&str> {
    result.hits.iter().map(|h| h.rule_id.as_str()).collect()
}

pub const PY_S3: &str = r#"import boto3

s3 = boto3.client("s3")


def upload_report(name, payload):
    s3.put_object(Bucket="reports", Key=name, Body=payload)
"#;

pub const PY_DYNAMODB: &str = r#"import boto3

dynamodb = boto3.resource("dynamodb")
table = dynamodb.Table("users")


def save_user(user_id, email):
    table.put_item(Item={"id": user_id, "email": email})
"#;

pub const PY_LAMBDA: &str = r#"import json

import boto3

s3 = boto3.client("s3")


def lambda_handler(event, context):
    obj = s3.get_object(Bucket="reports", Key=event["key"])
    return {"statusCode": 200, "body": json.dumps({"size": len(obj["Body"].read())})}
"#;

pub const JS_LAMBDA: &str = r#"const AWS = require('aws-sdk');
const s3 = new AWS.S3();

exports.handler = async (event, context) => {
  await s3.putObject({ Bucket: 'reports', Key: event.key, Body: event.body }).promise();
  return { statusCode: 200, body: 'stored' };
};
"#;

pub const JS_UNMAPPED: &str = r#"const AWS = require('aws-sdk');
const s3 = new AWS.S3();

async function archive(key) {
  await s3.copyObject({ CopySource: 'reports/' + key, Bucket: 'archive', Key: key }).promise();
}

module.exports = { archive };
"#;

pub const JS_DYNAMODB: &str = r#"const AWS = require('aws-sdk');
const db = new AWS.DynamoDB.DocumentClient();

async function saveUser(user) {
  await db.put({ TableName: 'users', Item: user }).promise();
}

module.exports = { saveUser };
"#;

pub const TS_LAMBDA: &str = r#"import { APIGatewayProxyEvent, APIGatewayProxyResult } from 'aws-lambda';

export const handler = async (event: APIGatewayProxyEvent): Promise<APIGatewayProxyResult> => {
  return { statusCode: 200, body: event.body ?? '' };
};
"#;

pub const GO_LAMBDA: &str = r#"package main

import (
	"context"
	"strings"

	"github.com/aws/aws-lambda-go/events"
	"github.com/aws/aws-lambda-go/lambda"
	"github.com/aws/aws-sdk-go/aws"
	"github.com/aws/aws-sdk-go/aws/session"
	"github.com/aws/aws-sdk-go/service/s3"
)

var svc = s3.New(session.Must(session.NewSession()))

func handler(ctx context.Context, req events.APIGatewayProxyRequest) (events.APIGatewayProxyResponse, error) {
	_, err := svc.PutObject(&s3.PutObjectInput{
		Bucket: aws.String("uploads"),
		Key:    aws.String(req.PathParameters["key"]),
		Body:   strings.NewReader(req.Body),
	})
	return events.APIGatewayProxyResponse{StatusCode: 200}, err
}

func main() {
	lambda.Start(handler)
}
"#;

/// Provider-free sources in every variant
pub fn clean_sources() -> Vec<(LanguageVariant, &'static str)> {
    vec![
        (
            LanguageVariant::JavaScript,
            "const path = require('path');\n\nfunction join(a, b) {\n  return path.join(a, b);\n}\n",
        ),
        (
            LanguageVariant::TypeScript,
            "export function add(a: number, b: number): number {\n  return a + b;\n}\n",
        ),
        (
            LanguageVariant::Python,
            "import os\n\n\ndef cwd():\n    return os.getcwd()\n",
        ),
        (
            LanguageVariant::Go,
            "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hi\")\n}\n",
        ),
    ]
}
