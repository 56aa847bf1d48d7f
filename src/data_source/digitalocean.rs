use crate::config::Api;
use crate::metrics::database::{self, Database};
use crate::metrics::volume::{self, Volume};
use anyhow::{Context, anyhow, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Client for the DigitalOcean v2 API.
///
/// List operations walk every page by following `links.pages.next`. Bounding the walk in
/// time is left to the caller.
#[derive(Clone)]
pub struct DigitalOcean {
    client: reqwest::Client,
    url: String,
    token: String,
    per_page: u32,
}

impl DigitalOcean {
    pub fn new(config: &Api) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create the HTTP client")?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            per_page: config.per_page,
        })
    }

    async fn list<P>(&self, path: &str) -> anyhow::Result<Vec<P::Item>>
    where
        P: Page,
    {
        let mut items = Vec::new();
        let mut next = Some(format!("{}{}?per_page={}", self.url, path, self.per_page));

        while let Some(url) = next.take() {
            let page = self.get::<P>(&url).await?;
            let (page_items, page_next) = page.into_parts();

            items.extend(page_items);
            next = page_next.filter(|next| *next != url);
        }

        Ok(items)
    }

    async fn get<P>(&self, url: &str) -> anyhow::Result<P>
    where
        P: DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send request to {}: {}", url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);

            bail!("{} returned status {}: {}", url, status, message.trim());
        }

        response
            .json::<P>()
            .await
            .with_context(|| format!("Failed to decode the response from {}", url))
    }
}

impl database::DataSource for DigitalOcean {
    fn list_databases(&self) -> impl Future<Output = anyhow::Result<Vec<Database>>> + Send {
        async move {
            let databases = self.list::<DatabasesPage>("/v2/databases").await?;
            Ok(databases.into_iter().map(Database::from).collect())
        }
    }
}

impl volume::DataSource for DigitalOcean {
    fn list_volumes(&self) -> impl Future<Output = anyhow::Result<Vec<Volume>>> + Send {
        async move {
            let volumes = self.list::<VolumesPage>("/v2/volumes").await?;
            Ok(volumes.into_iter().map(Volume::from).collect())
        }
    }
}

trait Page: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Links {
    pages: Pages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Pages {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatabasesPage {
    #[serde(default)]
    databases: Option<Vec<DatabaseItem>>,
    #[serde(default)]
    links: Links,
}

impl Page for DatabasesPage {
    type Item = DatabaseItem;

    fn into_parts(self) -> (Vec<DatabaseItem>, Option<String>) {
        (self.databases.unwrap_or_default(), self.links.pages.next)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatabaseItem {
    id: String,
    name: String,
    engine: String,
    version: String,
    num_nodes: u32,
    size: String,
    region: String,
    status: String,
    db_names: Option<Vec<String>>,
}

impl From<DatabaseItem> for Database {
    fn from(item: DatabaseItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            region: item.region,
            size: item.size,
            engine: item.engine,
            version: item.version,
            status: item.status,
            num_nodes: item.num_nodes,
            db_names: item.db_names.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VolumesPage {
    #[serde(default)]
    volumes: Option<Vec<VolumeItem>>,
    #[serde(default)]
    links: Links,
}

impl Page for VolumesPage {
    type Item = VolumeItem;

    fn into_parts(self) -> (Vec<VolumeItem>, Option<String>) {
        (self.volumes.unwrap_or_default(), self.links.pages.next)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VolumeItem {
    id: String,
    name: String,
    region: Region,
    size_gigabytes: u64,
    droplet_ids: Option<Vec<u64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Region {
    slug: String,
}

impl From<VolumeItem> for Volume {
    fn from(item: VolumeItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            region: item.region.slug,
            size_gigabytes: item.size_gigabytes,
            droplet_ids: item.droplet_ids.unwrap_or_default(),
        }
    }
}
