use serde::Deserialize;

/// Query for the most recent launches, newest first.
pub const LAUNCH_LISTING_QUERY: &str =
    "launch?page.page=1&page.size=50&page.sort=startTime%2Cnumber%2CDESC";

/// One page of the launch listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LaunchPage {
    #[serde(default)]
    pub content: Vec<LaunchListing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchListing {
    pub id: i64,
    pub uuid: String,
}

impl LaunchPage {
    /// Numeric id of the launch whose uuid matches.
    pub fn find(&self, uuid: &str) -> Option<i64> {
        self.content.iter().find(|l| l.uuid == uuid).map(|l| l.id)
    }
}

/// Build the UI link of a launch from the API endpoint.
///
/// Example: `https://rp.example.com/api/v1` → `https://rp.example.com/ui/#demo/launches/all/42`
pub fn launch_ui_url(endpoint: &str, project: &str, launch_number: i64) -> String {
    let base = endpoint.split("api").next().unwrap_or_default();
    format!("{base}ui/#{project}/launches/all/{launch_number}")
}
