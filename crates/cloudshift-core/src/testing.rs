//! Catalog fixture shared by unit tests

use crate::catalog::{Mapping, PatternCatalog, ProviderProfile};
use crate::types::ProviderId;

pub(crate) const CATALOG: &str = r#"
catalog_version: 1.0.0
families:
  - id: object_storage
  - id: function_runtime
  - id: common
    verify_presence: false
providers:
  - id: aws
    signatures:
      modules: [aws-sdk, "@aws-sdk/", boto3, github.com/aws/aws-sdk-go, github.com/aws/aws-lambda-go]
      identifiers: [AWS]
      uri_schemes: ["s3://"]
      handler_names: [handler, lambda_handler]
      factories: [client, resource, New]
  - id: azure
    signatures:
      modules: ["@azure/", azure.storage.blob]
    markers:
      object_storage: ['\bBlobServiceClient\b', '\bupload_blob\b', '\bgetBlockBlobClient\b']
      function_runtime: ['\bapp\.http\b']
mappings:
  - source: aws
    target: azure
    rules:
      - id: js.s3.client
        family: object_storage
        language: js
        match: { kind: construction, name: S3, receiver: '^AWS$' }
        rewrite:
          template: "BlobServiceClient.fromConnectionString(process.env.AZURE_STORAGE_CONNECTION_STRING)"
          imports:
            - { module: "@azure/storage-blob", names: [BlobServiceClient] }
      - id: js.s3.put-object
        family: object_storage
        language: js
        match: { kind: call, name: putObject, min_args: 1, max_args: 1 }
        rewrite:
          template: "$0.getContainerClient($1).getBlockBlobClient($2).upload($3, Buffer.byteLength($3))"
          captures:
            - { part: receiver }
            - { arg: 0, field: Bucket }
            - { arg: 0, field: Key }
            - { arg: 0, field: Body }
      - id: js.promise
        family: common
        language: js
        match: { kind: call, name: promise, max_args: 0 }
        rewrite:
          template: "$0"
          captures: [{ part: receiver }]
          requires_nested_rewrite: true
      - id: js.lambda.handler
        family: function_runtime
        language: js
        match: { kind: handler, name: handler, min_args: 1, max_args: 2 }
        rewrite:
          template: "app.http('handler', {\n  handler: async ($0, context) => $1,\n})"
          captures: [{ param: 0 }, { part: body }]
          imports:
            - { module: "@azure/functions", names: [app] }
      - id: py.s3.client
        family: object_storage
        language: python
        match: { kind: call, name: client, receiver: '^boto3$', literal_args: { 0: s3 } }
        rewrite:
          template: "BlobServiceClient.from_connection_string(os.environ[\"AZURE_STORAGE_CONNECTION_STRING\"])"
          imports:
            - { module: azure.storage.blob, names: [BlobServiceClient] }
            - { module: os }
      - id: py.s3.put-object
        family: object_storage
        language: python
        match: { kind: call, name: put_object }
        rewrite:
          template: "$0.get_blob_client(container=$1, blob=$2).upload_blob($3, overwrite=True)"
          captures:
            - { part: receiver }
            - { keyword: Bucket }
            - { keyword: Key }
            - { keyword: Body }
      - id: go.s3.new
        family: object_storage
        language: go
        match: { kind: call, name: New, receiver: '^s3$', max_args: 1 }
        rewrite:
          template: "azblob.NewClientFromConnectionString(os.Getenv(\"AZURE_STORAGE_CONNECTION_STRING\"), nil)"
          imports:
            - { module: github.com/Azure/azure-sdk-for-go/sdk/storage/azblob }
            - { module: os }
      - id: go.s3.put-object
        family: object_storage
        language: go
        match: { kind: call, name: PutObject, min_args: 1, max_args: 1, construct_args: { 0: PutObjectInput } }
        rewrite:
          template: "$0.UploadStream(context.TODO(), $1, $2, $3, nil)"
          captures:
            - { part: receiver }
            - { arg: 0, field: Bucket }
            - { arg: 0, field: Key }
            - { arg: 0, field: Body }
      - id: go.aws.string
        family: common
        language: go
        match: { kind: call, name: String, receiver: '^aws$', min_args: 1, max_args: 1 }
        rewrite:
          template: "$0"
          captures: [{ arg: 0 }]
          requires_enclosing_rewrite: true
      - id: go.lambda.handler
        family: function_runtime
        language: go
        match: { kind: handler, name: "*", min_args: 2, max_args: 2 }
        rewrite:
          template: "$0(w http.ResponseWriter, r *http.Request)"
          captures: [{ part: name }]
          requires: full
    cleanup:
      - id: s3-uri
        language: any
        scope: string
        pattern: 's3://([A-Za-z0-9.\-_]+)/'
        replacement: 'https://${1}.blob.core.windows.net/'
      - id: aws-comment
        language: js
        scope: comment
        pattern: '\bAWS S3\b'
        replacement: 'Azure Blob Storage'
"#;

pub(crate) fn catalog() -> PatternCatalog {
    PatternCatalog::from_yaml_str(CATALOG).expect("fixture catalog compiles")
}

/// The aws→azure mapping with both provider profiles
pub(crate) fn aws_azure(catalog: &PatternCatalog) -> (&Mapping, &ProviderProfile, &ProviderProfile) {
    let aws = ProviderId::new("aws");
    let azure = ProviderId::new("azure");
    (
        catalog.mapping(&aws, &azure).expect("fixture mapping"),
        catalog.provider(&aws).expect("aws profile"),
        catalog.provider(&azure).expect("azure profile"),
    )
}
