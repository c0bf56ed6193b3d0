pub mod assertions;
pub mod cases;
pub mod error;
pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod outcome;
pub mod report;
pub mod runner;
pub mod search;
pub mod suites;
pub mod user_manager;

pub use assertions::{
    assert_error_message, assert_json_key_exists, assert_json_value, assert_pagination,
    assert_response_contains, assert_response_time, assert_status_code, assert_success_response,
    assert_token_structure, assert_unauthorized, assert_user_data, assert_validation_error,
};
pub use cases::{by_tag, find, runnable, ApiCase, AuthMode, Check, CheckContext, Expected, Payload};
pub use error::{AssertResult, AssertionError, HarnessError, HarnessResult};
pub use fixtures::{admin_auth_token, artisan_auth_token, extract_token, login, login_token};
pub use logging::init_logging;
pub use outcome::{CaseMetrics, CaseOutcome};
pub use report::{CaseReport, RunReport, SuiteReport};
pub use runner::{judge, CaseRunner};
pub use search::{classify_search, SearchBugReport, SearchAttempt, SearchVerdict};
pub use suites::{search_bug_report, CaseFilter, Suite, SuiteRegistry};
pub use user_manager::{TestUser, UserManager};
