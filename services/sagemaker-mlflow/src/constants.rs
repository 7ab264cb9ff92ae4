// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.


use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Headers used in aws services.
pub const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
pub const X_AMZ_DATE: &str = "x-amz-date";
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
pub const X_AMZ_TARGET: &str = "x-amz-target";

// Routing headers understood by SageMaker MLflow.
pub const X_MLFLOW_SM_TRACKING_SERVER_ARN: &str = "x-mlflow-sm-tracking-server-arn";
pub const X_SM_MLFLOW_APP_ARN: &str = "x-sm-mlflow-app-arn";

// Env values used in aws services.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_PROFILE: &str = "AWS_PROFILE";
pub const AWS_CONFIG_FILE: &str = "AWS_CONFIG_FILE";
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

// Env values used by SageMaker MLflow.
pub const SAGEMAKER_MLFLOW_CUSTOM_ENDPOINT: &str = "SAGEMAKER_MLFLOW_CUSTOM_ENDPOINT";
pub const SAGEMAKER_MLFLOW_ASSUME_ROLE_ARN: &str = "SAGEMAKER_MLFLOW_ASSUME_ROLE_ARN";
pub const SAGEMAKER_MLFLOW_ASSUME_ROLE_CREDENTIAL_TTL: &str =
    "SAGEMAKER_MLFLOW_ASSUME_ROLE_CREDENTIAL_TTL";
pub const SAGEMAKER_ENDPOINT_URL: &str = "SAGEMAKER_ENDPOINT_URL";

/// Separates the MLflow resource ARN from an appended role ARN.
pub const ROLE_ARN_SEPARATOR: char = '#';

pub const SAGEMAKER_SERVICE: &str = "sagemaker";
pub const IAM_SERVICE: &str = "iam";

/// Signing name of tracking server requests.
pub const SAGEMAKER_MLFLOW_SIGNING_SERVICE: &str = "sagemaker-mlflow";

/// Role session name used for every STS AssumeRole exchange.
pub const ROLE_SESSION_NAME: &str = "sagemaker-mlflow";

// Lifetime of assumed role credentials in the cache, in seconds.
pub const DEFAULT_ASSUME_ROLE_CREDENTIAL_TTL: u64 = 3300;
pub const MIN_ASSUME_ROLE_CREDENTIAL_TTL: u64 = 300;
pub const MAX_ASSUME_ROLE_CREDENTIAL_TTL: u64 = 3600;

/// Bodies are hashed in chunks of this many bytes.
pub const PAYLOAD_BUFFER: usize = 1024 * 1024;

/// AsciiSet for [AWS UriEncode](https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html)
///
/// - URI encode every byte except the unreserved characters: 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
pub static AWS_URI_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// AsciiSet for [AWS UriEncode](https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html)
///
/// But used in query.
pub static AWS_QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
