//! Integration tests for rendering acquired specs

use std::fs;
use std::path::Path;
use swaggerdoc_common::{
    ConfigBuilder, Layer, RawOptions, ScratchWorkspace, SwaggerdocError,
};
use swaggerdoc_generator::{RenderDispatcher, RenderRequest, WiddershinsConverter};
use tempfile::TempDir;

const PETSTORE_JSON: &str = r#"{
  "swagger": "2.0",
  "info": {"title": "Swagger Petstore", "version": "1.0.0", "description": "A sample API"},
  "host": "petstore.swagger.io",
  "basePath": "/v1",
  "schemes": ["http"],
  "paths": {
    "/pets": {
      "get": {
        "summary": "List all pets",
        "operationId": "listPets",
        "parameters": [
          {"name": "limit", "in": "query", "description": "How many items to return", "required": false, "type": "integer"}
        ],
        "responses": {"200": {"description": "A paged array of pets"}}
      }
    },
    "/pets/{petId}": {
      "get": {
        "summary": "Info for a specific pet",
        "parameters": [
          {"name": "petId", "in": "path", "required": true, "type": "string"}
        ],
        "responses": {"200": {"description": "Expected response to a valid request"}}
      }
    }
  },
  "definitions": {
    "Pet": {"type": "object", "required": ["id", "name"]}
  }
}"#;

const PETSTORE_YAML: &str = r#"swagger: "2.0"
info:
  title: Swagger Petstore
  version: 1.0.0
  description: A sample API
host: petstore.swagger.io
basePath: /v1
schemes:
  - http
paths:
  /pets:
    get:
      summary: List all pets
      operationId: listPets
      parameters:
        - name: limit
          in: query
          description: How many items to return
          required: false
          type: integer
      responses:
        200:
          description: A paged array of pets
  /pets/{petId}:
    get:
      summary: Info for a specific pet
      parameters:
        - name: petId
          in: path
          required: true
          type: string
      responses:
        200:
          description: Expected response to a valid request
definitions:
  Pet:
    type: object
    required:
      - id
      - name
"#;

fn request(project: &Path, workspace: &mut ScratchWorkspace, options: &[(&str, &str)]) -> RenderRequest {
    let mut tag = RawOptions::new();
    for (key, value) in options {
        tag.insert(key, *value);
    }
    let config = ConfigBuilder::new(RawOptions::defaults())
        .layer(Layer::Tag, tag, project)
        .build()
        .unwrap()
        .config;

    RenderRequest {
        spec: config.spec_path.clone().unwrap(),
        config,
        invocation: workspace.begin_invocation(),
    }
}

#[test]
fn test_json_and_yaml_render_identically() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("petstore.json"), PETSTORE_JSON).unwrap();
    fs::write(project.path().join("petstore.yaml"), PETSTORE_YAML).unwrap();
    let mut workspace = ScratchWorkspace::create(project.path()).unwrap();
    let dispatcher = RenderDispatcher::new(project.path());

    let from_json = dispatcher
        .render(&request(project.path(), &mut workspace, &[("spec_path", "petstore.json")]))
        .unwrap();
    let from_yaml = dispatcher
        .render(&request(project.path(), &mut workspace, &[("spec_path", "petstore.yaml")]))
        .unwrap();

    assert_eq!(from_json, from_yaml);
    assert!(from_json.contains("# Swagger Petstore"));
    assert!(from_json.contains("**Base URL:** `http://petstore.swagger.io/v1`"));
    assert!(from_json.contains("### GET /pets/{petId}"));
    assert!(from_json.contains("| petId | path | string | true |  |"));
}

#[test]
fn test_additional_spec_contributes_missing_sections() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("petstore.json"), PETSTORE_JSON).unwrap();
    fs::write(
        project.path().join("extra.yaml"),
        "info:\n  title: Ignored\nservers:\n  - url: https://mirror.example.com\n",
    )
    .unwrap();
    let mut workspace = ScratchWorkspace::create(project.path()).unwrap();

    let markdown = RenderDispatcher::new(project.path())
        .render(&request(
            project.path(),
            &mut workspace,
            &[("spec_path", "petstore.json"), ("additional_json_path", "extra.yaml")],
        ))
        .unwrap();

    assert!(markdown.contains("# Swagger Petstore"));
    assert!(!markdown.contains("Ignored"));
    assert!(markdown.contains("- `https://mirror.example.com`"));
}

#[test]
fn test_missing_converter_fails_with_log() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("petstore.json"), PETSTORE_JSON).unwrap();
    let mut workspace = ScratchWorkspace::create(project.path()).unwrap();
    let mut dispatcher = RenderDispatcher::new(project.path());
    dispatcher.set_converter(Box::new(
        WiddershinsConverter::with_command("swaggerdoc-missing-widdershins").unwrap(),
    ));

    let req = request(
        project.path(),
        &mut workspace,
        &[("spec_path", "petstore.json"), ("mode", "widdershins")],
    );
    let err = dispatcher.render(&req).unwrap_err();

    assert!(matches!(err, SwaggerdocError::ConverterExecution { .. }));
    assert!(req.invocation.converter_log_path().exists());
    assert!(!req.invocation.converter_output_path().exists());
}
