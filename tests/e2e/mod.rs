mod dashboard_workflow_tests;
mod quota_api_tests;
