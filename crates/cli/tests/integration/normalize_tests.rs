use super::common::run_json;

#[test]
fn normalized_plan_drops_orphans() {
  let plan = run_json("normalize", "node_plan.json", &[]);

  let names: Vec<&str> = plan["steps"]
    .as_array()
    .unwrap()
    .iter()
    .filter_map(|step| step["name"].as_str())
    .collect();
  assert_eq!(names, vec!["packages:mise", "install", "build"]);
}

#[test]
fn normalized_plan_drops_empty_deploy_inputs() {
  let plan = run_json("normalize", "node_plan.json", &[]);
  assert_eq!(plan["deploy"]["inputs"].as_array().map(Vec::len), Some(3));
}

#[test]
fn layer_filters_keep_their_shape() {
  let plan = run_json("normalize", "node_plan.json", &[]);
  let build_input = &plan["deploy"]["inputs"][2];
  assert_eq!(build_input["step"], "build");
  assert_eq!(build_input["include"], serde_json::json!(["."]));
  assert_eq!(build_input["exclude"], serde_json::json!(["node_modules", ".git"]));
}
