use rusqlite::Connection;

/// Table and column names follow the layout the station screens have always shared.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    orderId INTEGER PRIMARY KEY AUTOINCREMENT,
    componentName TEXT NOT NULL,
    partNumber TEXT NOT NULL,
    orderBy TEXT,
    orderDate TEXT,
    dueDate TEXT,
    quantity INTEGER,
    UNIQUE (componentName, partNumber)
);

CREATE TABLE IF NOT EXISTS parametersDetails (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    orderId INTEGER NOT NULL REFERENCES orders(orderId),
    parameterName TEXT NOT NULL,
    low REAL,
    high REAL,
    UNIQUE (orderId, parameterName)
);

CREATE TABLE IF NOT EXISTS measuredValues (
    orderId INTEGER NOT NULL,
    componentSerialNumber INTEGER NOT NULL,
    componentName TEXT NOT NULL,
    partNumber TEXT NOT NULL,
    parameterName TEXT NOT NULL,
    operatorName TEXT NOT NULL,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    value TEXT NOT NULL,
    isValid TEXT NOT NULL,
    PRIMARY KEY (orderId, componentSerialNumber)
);

CREATE INDEX IF NOT EXISTS idx_measured_values_lookup
    ON measuredValues (partNumber, componentName, parameterName);

CREATE TABLE IF NOT EXISTS serialCounters (
    orderId INTEGER PRIMARY KEY,
    lastSerial INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    username TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    employee_type TEXT NOT NULL
);
"#;

/// Order detail columns added after the first release, with their types.
const ORDER_DETAIL_COLUMNS: [(&str, &str); 4] = [
    ("orderBy", "TEXT"),
    ("orderDate", "TEXT"),
    ("dueDate", "TEXT"),
    ("quantity", "INTEGER"),
];

pub(super) fn create(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    add_missing_order_columns(conn)
}

fn add_missing_order_columns(conn: &Connection) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('orders')")?;
    let existing = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (column, kind) in ORDER_DETAIL_COLUMNS {
        if !existing.iter().any(|name| name == column) {
            conn.execute_batch(&format!("ALTER TABLE orders ADD COLUMN {column} {kind};"))?;
            tracing::info!(column, "orders column added");
        }
    }
    Ok(())
}
