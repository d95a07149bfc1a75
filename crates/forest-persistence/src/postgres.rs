//! PostgreSQL-backed sink (spec §4.7 AMBIENT, `database` feature), following
//! the teacher's `rbp-database`/`rbp-pg` `Schema`/upsert split. The event
//! tree's [`Sink`] contract is synchronous (spec §5 "performs synchronous
//! writes"), so every call blocks on the async `tokio-postgres` client via an
//! owned runtime rather than exposing `async fn` at the trait boundary.
use const_format::concatcp;
use tokio_postgres::Client;

use forest_core::{ForestError, NodePath};
use forest_stand::Payload;
use forest_tree::Sink;

use crate::tables::{collected_table, NODES, STANDS, STRATA, TREES};

const CREATE_NODES: &str = concatcp!(
    "CREATE TABLE IF NOT EXISTS ",
    NODES,
    " (node_path TEXT NOT NULL, stand_id TEXT NOT NULL, treatment TEXT NOT NULL, ",
    "parameters JSONB NOT NULL, PRIMARY KEY (node_path, stand_id))"
);
const CREATE_STANDS: &str = concatcp!(
    "CREATE TABLE IF NOT EXISTS ",
    STANDS,
    " (node_path TEXT NOT NULL, stand_id TEXT NOT NULL, area DOUBLE PRECISION, ",
    "degree_days INTEGER, site_class INTEGER, soil_class INTEGER, dominant_species INTEGER, ",
    "dominant_storey_age DOUBLE PRECISION, dominant_height DOUBLE PRECISION, ",
    "PRIMARY KEY (node_path, stand_id))"
);
const CREATE_TREES: &str = concatcp!(
    "CREATE TABLE IF NOT EXISTS ",
    TREES,
    " (node_path TEXT NOT NULL, stand_id TEXT NOT NULL, row_index INTEGER NOT NULL, ",
    "identifier TEXT, species INTEGER, breast_height_diameter DOUBLE PRECISION, ",
    "height DOUBLE PRECISION, stems_per_ha DOUBLE PRECISION, ",
    "PRIMARY KEY (node_path, stand_id, row_index))"
);
const CREATE_STRATA: &str = concatcp!(
    "CREATE TABLE IF NOT EXISTS ",
    STRATA,
    " (node_path TEXT NOT NULL, stand_id TEXT NOT NULL, row_index INTEGER NOT NULL, ",
    "identifier TEXT, species INTEGER, mean_diameter DOUBLE PRECISION, ",
    "stems_per_ha DOUBLE PRECISION, PRIMARY KEY (node_path, stand_id, row_index))"
);

const INSERT_NODE: &str = concatcp!(
    "INSERT INTO ",
    NODES,
    " (node_path, stand_id, treatment, parameters) VALUES ($1, $2, $3, $4) ",
    "ON CONFLICT (node_path, stand_id) DO UPDATE SET treatment = EXCLUDED.treatment, ",
    "parameters = EXCLUDED.parameters"
);
const INSERT_STAND: &str = concatcp!(
    "INSERT INTO ",
    STANDS,
    " (node_path, stand_id, area, degree_days, site_class, soil_class, dominant_species, ",
    "dominant_storey_age, dominant_height) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ",
    "ON CONFLICT (node_path, stand_id) DO NOTHING"
);

fn path_key(path: &NodePath) -> String {
    path.iter().map(usize::to_string).collect::<Vec<_>>().join("-")
}

/// A `tokio-postgres` client wired up as a [`Sink`], creating its tables on
/// first use (spec §4.7's logical schema, relaxed to `CREATE TABLE IF NOT
/// EXISTS` since bit-exact layout is explicitly not a goal).
pub struct PostgresSink {
    client: Client,
    runtime: tokio::runtime::Runtime,
    schema_ready: bool,
    row_counts: std::collections::BTreeMap<(NodePath, String), usize>,
}

impl PostgresSink {
    /// Wraps an already-connected client. The caller is responsible for
    /// having spawned its connection-driving future on a runtime that
    /// outlives this sink; prefer [`PostgresSink::connect`] unless the
    /// caller already manages its own `tokio` runtime.
    pub fn new(client: Client) -> Result<Self, ForestError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ForestError::Environment(format!("building tokio runtime: {e}")))?;
        Ok(Self { client, runtime, schema_ready: false, row_counts: Default::default() })
    }

    /// Connects to `database_url` and spawns the connection's background I/O
    /// driver on the same runtime this sink uses for every subsequent write,
    /// so the driver is never left orphaned on a runtime that gets dropped
    /// out from under it (spec §5 "performs synchronous writes" — the
    /// runtime itself is this sink's private implementation detail).
    pub fn connect(database_url: &str) -> Result<Self, ForestError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ForestError::Environment(format!("building tokio runtime: {e}")))?;
        let client = runtime.block_on(async {
            let (client, connection) = tokio_postgres::connect(database_url, tokio_postgres::NoTls)
                .await
                .map_err(|e| ForestError::Environment(format!("connecting to {database_url}: {e}")))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    log::error!("postgres connection error: {e}");
                }
            });
            Ok::<_, ForestError>(client)
        })?;
        Ok(Self { client, runtime, schema_ready: false, row_counts: Default::default() })
    }

    fn ensure_schema(&mut self) -> Result<(), ForestError> {
        if self.schema_ready {
            return Ok(());
        }
        let client = &self.client;
        self.runtime
            .block_on(async {
                client.batch_execute(CREATE_NODES).await?;
                client.batch_execute(CREATE_STANDS).await?;
                client.batch_execute(CREATE_TREES).await?;
                client.batch_execute(CREATE_STRATA).await?;
                Ok::<_, tokio_postgres::Error>(())
            })
            .map_err(|e| ForestError::Environment(format!("creating schema: {e}")))?;
        self.schema_ready = true;
        Ok(())
    }
}

impl Sink for PostgresSink {
    fn record_node(&mut self, path: &NodePath, payload: &Payload) -> Result<(), ForestError> {
        self.ensure_schema()?;
        let key = path_key(path);
        let stand_id = &payload.stand.identifier;
        let treatment = payload
            .history
            .last()
            .map(|h| h.treatment.as_str())
            .unwrap_or("root");
        let parameters = payload
            .history
            .last()
            .map(|h| h.parameters.clone())
            .unwrap_or(serde_json::Value::Null);

        let parent_path: NodePath = path[..path.len().saturating_sub(1)].to_vec();
        let mut deltas = Vec::new();
        for kind in payload.collected.kinds() {
            let table = collected_table(kind)?;
            let rows = payload.collected.rows(kind);
            let total = rows.len();
            let prior = self
                .row_counts
                .get(&(parent_path.clone(), kind.to_string()))
                .copied()
                .unwrap_or(0)
                .min(total);
            deltas.push((table, rows[prior..total].to_vec()));
            self.row_counts.insert((path.clone(), kind.to_string()), total);
        }

        let client = &self.client;
        self.runtime
            .block_on(async {
                client
                    .execute(INSERT_NODE, &[&key, stand_id, &treatment, &parameters])
                    .await?;
                client
                    .execute(
                        INSERT_STAND,
                        &[
                            &key,
                            stand_id,
                            &payload.stand.area,
                            &payload.stand.degree_days,
                            &payload.stand.site_class,
                            &payload.stand.soil_class,
                            &payload.stand.dominant_species,
                            &payload.stand.dominant_storey_age,
                            &payload.stand.dominant_height,
                        ],
                    )
                    .await?;
                for i in 0..payload.stand.reference_trees.len() {
                    let rec = payload.stand.reference_trees.read(i);
                    let sql = format!(
                        "INSERT INTO {TREES} (node_path, stand_id, row_index, identifier, species, \
                         breast_height_diameter, height, stems_per_ha) VALUES ($1,$2,$3,$4,$5,$6,$7,$8) \
                         ON CONFLICT (node_path, stand_id, row_index) DO NOTHING"
                    );
                    client
                        .execute(
                            &sql,
                            &[
                                &key,
                                stand_id,
                                &(i as i32),
                                &rec.identifier,
                                &rec.species,
                                &rec.breast_height_diameter,
                                &rec.height,
                                &rec.stems_per_ha,
                            ],
                        )
                        .await?;
                }
                for i in 0..payload.stand.tree_strata.len() {
                    let rec = payload.stand.tree_strata.read(i);
                    let sql = format!(
                        "INSERT INTO {STRATA} (node_path, stand_id, row_index, identifier, species, \
                         mean_diameter, stems_per_ha) VALUES ($1,$2,$3,$4,$5,$6,$7) \
                         ON CONFLICT (node_path, stand_id, row_index) DO NOTHING"
                    );
                    client
                        .execute(
                            &sql,
                            &[
                                &key,
                                stand_id,
                                &(i as i32),
                                &rec.identifier,
                                &rec.species,
                                &rec.mean_diameter,
                                &rec.stems_per_ha,
                            ],
                        )
                        .await?;
                }
                for (table, rows) in &deltas {
                    if rows.is_empty() {
                        continue;
                    }
                    let create = format!(
                        "CREATE TABLE IF NOT EXISTS {table} (node_path TEXT NOT NULL, stand_id TEXT NOT NULL, row JSONB NOT NULL)"
                    );
                    client.batch_execute(&create).await?;
                    for row in rows {
                        let insert =
                            format!("INSERT INTO {table} (node_path, stand_id, row) VALUES ($1, $2, $3)");
                        client.execute(&insert, &[&key, stand_id, row]).await?;
                    }
                }
                Ok::<_, tokio_postgres::Error>(())
            })
            .map_err(|e| ForestError::Environment(format!("postgres write: {e}")))
    }
}
