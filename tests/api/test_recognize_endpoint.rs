// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /recognize endpoint tests
//!
//! The detector and classifier are stubs, so these tests cover upload
//! handling, validation order, response shapes and cleanup rather than
//! model accuracy.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use image::ImageFormat;
use lpr_node::api::MAX_BODY_SIZE;
use tower::util::ServiceExt; // for `oneshot`

use super::common::*;

#[tokio::test]
async fn test_every_accepted_format_returns_success_field() {
    let formats = [
        ("car.png", ImageFormat::Png),
        ("car.jpg", ImageFormat::Jpeg),
        ("car.jpeg", ImageFormat::Jpeg),
        ("car.gif", ImageFormat::Gif),
        ("car.bmp", ImageFormat::Bmp),
    ];

    for (filename, format) in formats {
        let test_app = setup_default_app().await;
        let data = encode(&vehicle_image(), format);

        let response = test_app
            .app
            .clone()
            .oneshot(upload_request(filename, &data))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "format {}", filename);
        let json = body_json(response).await;
        assert_eq!(json["success"], true, "format {}", filename);
        assert_eq!(json["message"], "License plate recognized successfully");
        assert_eq!(json["uploaded_file"], filename);
    }
}

#[tokio::test]
async fn test_success_response_shape() {
    let test_app = setup_default_app().await;

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request("my car.png", &vehicle_png()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("application/json"));

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["uploaded_file"], "my_car.png");
    let result_image = json["result_image"].as_str().unwrap();
    assert!(result_image.starts_with("/result_image/result_my_car_"));
    assert!(result_image.ends_with(".jpg"));
    assert_eq!(json["plate_text"], "AA");
    assert!((json["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    assert_eq!(json["bounding_box"]["x"], 100);
    assert_eq!(json["bounding_box"]["y"], 100);
    assert_eq!(json["bounding_box"]["width"], 333);
    assert_eq!(json["bounding_box"]["height"], 75);

    assert_eq!(test_app.detector_calls(), 1);
    assert_eq!(test_app.upload_count(), 0, "upload must be cleaned up");
    let result_name = result_image.trim_start_matches("/result_image/");
    assert!(test_app.output_dir.join(result_name).exists());
}

#[tokio::test]
async fn test_same_name_uploads_keep_separate_results() {
    let test_app = setup_default_app().await;

    let mut paths = Vec::new();
    for filename in ["car.png", "car.jpg", "car.png"] {
        let format = if filename.ends_with(".png") {
            ImageFormat::Png
        } else {
            ImageFormat::Jpeg
        };
        let response = test_app
            .app
            .clone()
            .oneshot(upload_request(filename, &encode(&vehicle_image(), format)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        paths.push(json["result_image"].as_str().unwrap().to_string());
    }

    assert_ne!(paths[0], paths[1]);
    assert_ne!(paths[0], paths[2]);
    assert_eq!(test_app.output_count(), 3);
}

#[tokio::test]
async fn test_file_field_is_accepted() {
    let test_app = setup_default_app().await;
    let data = vehicle_png();

    let request = multipart_request(
        "/recognize",
        &[Part {
            name: "file",
            filename: Some("car.png"),
            data: &data,
        }],
    );
    let response = test_app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
}

#[tokio::test]
async fn test_no_plate_is_detection_error() {
    let test_app = setup_app(StubOptions {
        plate: None,
        ..Default::default()
    })
    .await;

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request("empty_road.jpg", &encode(&vehicle_image(), ImageFormat::Jpeg)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Could not detect license plate in the image");
    assert_eq!(
        json["message"],
        "The image may not contain a visible license plate. Try a different image with a clearer license plate."
    );
    assert!(json.get("details").is_none());

    assert_eq!(test_app.upload_count(), 0);
    assert_eq!(test_app.output_count(), 0);
}

#[tokio::test]
async fn test_unsupported_extension_rejected_before_inference() {
    let test_app = setup_default_app().await;

    for filename in ["car.txt", "car.webp", "car"] {
        let response = test_app
            .app
            .clone()
            .oneshot(upload_request(filename, &vehicle_png()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "Invalid file type. Allowed types: png, jpg, jpeg, gif, bmp"
        );
    }

    assert_eq!(test_app.detector_calls(), 0);
    assert_eq!(test_app.upload_count(), 0);
}

#[tokio::test]
async fn test_empty_filename_rejected() {
    let test_app = setup_default_app().await;

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request("", &vehicle_png()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No file selected");
    assert_eq!(test_app.detector_calls(), 0);
}

#[tokio::test]
async fn test_missing_image_rejected() {
    let test_app = setup_default_app().await;

    // Form without a file part
    let request = multipart_request(
        "/recognize",
        &[Part {
            name: "return_image",
            filename: None,
            data: b"true",
        }],
    );
    let response = test_app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("No image file provided."));

    // No body and no content type at all
    let request = Request::builder()
        .method(Method::POST)
        .uri("/recognize")
        .body(Body::empty())
        .unwrap();
    let response = test_app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(test_app.detector_calls(), 0);
}

#[tokio::test]
async fn test_undecodable_image_rejected() {
    let test_app = setup_default_app().await;

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request("car.png", b"definitely not a png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid image");
    assert_eq!(test_app.detector_calls(), 0);
    assert_eq!(test_app.upload_count(), 0);
}

#[tokio::test]
async fn test_return_image_form_field() {
    let test_app = setup_default_app().await;
    let data = vehicle_png();

    let request = multipart_request(
        "/recognize",
        &[
            Part {
                name: "image",
                filename: Some("car.png"),
                data: &data,
            },
            Part {
                name: "return_image",
                filename: None,
                data: b"True",
            },
        ],
    );
    let response = test_app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "image/jpeg");
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);

    let annotated = image::load_from_memory(&bytes).unwrap();
    assert_eq!((annotated.width(), annotated.height()), (600, 300));
}

#[tokio::test]
async fn test_return_image_query_parameter() {
    let test_app = setup_default_app().await;
    let data = vehicle_png();

    let request = multipart_request(
        "/recognize?return_image=TRUE",
        &[Part {
            name: "image",
            filename: Some("car.png"),
            data: &data,
        }],
    );
    let response = test_app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "image/jpeg");
}

#[tokio::test]
async fn test_return_image_false_yields_json() {
    let test_app = setup_default_app().await;
    let data = vehicle_png();

    let request = multipart_request(
        "/recognize",
        &[
            Part {
                name: "image",
                filename: Some("car.png"),
                data: &data,
            },
            Part {
                name: "return_image",
                filename: None,
                data: b"false",
            },
        ],
    );
    let response = test_app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("application/json"));
}

#[tokio::test]
async fn test_raw_body_upload() {
    let test_app = setup_default_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/recognize")
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(vehicle_png()))
        .unwrap();
    let response = test_app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let uploaded = json["uploaded_file"].as_str().unwrap();
    assert!(uploaded.starts_with("upload_"));
    assert!(uploaded.ends_with(".jpg"));
    assert_eq!(test_app.upload_count(), 0);
}

#[tokio::test]
async fn test_empty_raw_body_rejected() {
    let test_app = setup_default_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/recognize")
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::empty())
        .unwrap();
    let response = test_app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("No image file provided."));
}

#[tokio::test]
async fn test_classifier_failure_is_recognition_error() {
    let test_app = setup_app(StubOptions {
        classifier_fails: true,
        ..Default::default()
    })
    .await;

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request("car.png", &vehicle_png()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Error during license plate recognition");
    assert!(json.get("details").is_none());
    assert_eq!(test_app.upload_count(), 0);
}

#[tokio::test]
async fn test_error_details_when_enabled() {
    let test_app = setup_app(StubOptions {
        classifier_fails: true,
        error_details: true,
        ..Default::default()
    })
    .await;

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request("car.png", &vehicle_png()))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert!(json["details"]
        .as_str()
        .unwrap()
        .contains("classifier output malformed"));
}

#[tokio::test]
async fn test_detector_failure_is_internal_error() {
    let test_app = setup_app(StubOptions {
        detector_fails: true,
        ..Default::default()
    })
    .await;

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request("car.png", &vehicle_png()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Internal server error");
    assert_eq!(test_app.upload_count(), 0);
}

#[tokio::test]
async fn test_duplicated_query_key_is_json_error() {
    let test_app = setup_default_app().await;
    let data = vehicle_png();

    let request = multipart_request(
        "/recognize?return_image=true&return_image=false",
        &[Part {
            name: "image",
            filename: Some("car.png"),
            data: &data,
        }],
    );
    let response = test_app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(content_type(&response).starts_with("application/json"));
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid request");
    assert!(json["message"].is_string());

    assert_eq!(test_app.detector_calls(), 0);
    assert_eq!(test_app.upload_count(), 0);
}

#[tokio::test]
async fn test_multipart_over_body_limit_rejected() {
    let test_app = setup_default_app().await;
    let data = vec![0u8; MAX_BODY_SIZE + 1];

    let response = test_app
        .app
        .clone()
        .oneshot(upload_request("huge.png", &data))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid request");

    assert_eq!(test_app.detector_calls(), 0);
    assert_eq!(test_app.upload_count(), 0);
}

#[tokio::test]
async fn test_raw_body_over_limit_rejected() {
    let test_app = setup_default_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/recognize")
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(vec![0u8; MAX_BODY_SIZE + 1]))
        .unwrap();
    let response = test_app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid request");

    assert_eq!(test_app.detector_calls(), 0);
    assert_eq!(test_app.upload_count(), 0);
}

#[tokio::test]
async fn test_get_not_allowed() {
    let test_app = setup_default_app().await;

    let response = test_app
        .app
        .clone()
        .oneshot(get_request("/recognize"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
