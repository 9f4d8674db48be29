use std::fmt;

use thiserror::Error;

///////////////////////////////////////////////////////////////////////////////

/// Marks where the JDBC setter for parameter 2 of the typed query goes.
pub const PLACEHOLDER: &str = "%v";

/// Shell script run inside the client container.
///
/// Writes a JDBC program to `main.java`, converts the node key into the DER
/// PKCS#8 form the driver's `LibPQFactory` expects, then compiles and runs the
/// program. Every check in the program throws, so any mismatch surfaces as a
/// non-zero exit of `java` (and of the script, thanks to `set -e`).
pub const JAVA_SCRIPT: &str = r#"
set -e
cat > main.java << 'EOF'
import java.sql.*;

public class main {
	public static void main(String[] args) throws Exception {
		Class.forName("org.postgresql.Driver");

		String DB_URL = "jdbc:postgresql://";
		DB_URL += System.getenv("PGHOST") + ":" + System.getenv("PGPORT");
		DB_URL += "/test?ssl=true";
		DB_URL += "&sslcert=" + System.getenv("PGSSLCERT");
		DB_URL += "&sslkey=key.pk8";
		DB_URL += "&sslrootcert=/certs/ca.crt";
		DB_URL += "&sslfactory=org.postgresql.ssl.jdbc4.LibPQFactory";
		Connection conn = DriverManager.getConnection(DB_URL);

		PreparedStatement stmt = conn.prepareStatement("CREATE DATABASE test");
		int res = stmt.executeUpdate();
		if (res != 0) {
		    throw new Exception("unexpected: CREATE DATABASE reports " + res + " rows changed, expecting 0");
		}

		stmt = conn.prepareStatement("CREATE TABLE test.f (x INT, ts TIMESTAMP)");
		res = stmt.executeUpdate();
		if (res != 0) {
		    throw new Exception("unexpected: CREATE TABLE reports " + res + " rows changed, expecting 0");
		}

		stmt = conn.prepareStatement("INSERT INTO test.f VALUES (42, timestamp '2015-05-07 18:20:00')");
		res = stmt.executeUpdate();
		if (res != 1) {
		    throw new Exception("unexpected: INSERT reports " + res + " rows changed, expecting 1");
		}

		stmt = conn.prepareStatement("SELECT * FROM test.f");
		ResultSet rs = stmt.executeQuery();
		rs.next();
		int a = rs.getInt(1);
		if (a != 42) {
		    throw new Exception("unexpected: SELECT can't find inserted value: read " + a + ", expecting 42");
		}
		String tsStr = rs.getTimestamp(2).toString();
		if (!tsStr.equals("2015-05-07 18:20:00.0")) {
			throw new Exception("unexpected value for ts: "+tsStr);
		}

		stmt = conn.prepareStatement("INSERT INTO test.f VALUES (?, ?)");
		stmt.setInt(1, 1);
		stmt.setTimestamp(2, new Timestamp(System.currentTimeMillis()));
		res = stmt.executeUpdate();
		if (res != 1) {
		    throw new Exception("unexpected: INSERT reports " + res + " rows changed, expecting 1");
		}

		stmt = conn.prepareStatement("DROP TABLE test.f");
		res = stmt.executeUpdate();
		if (res != 0) {
		    throw new Exception("unexpected: DROP TABLE reports " + res + " rows changed, expecting 0");
		}

		stmt = conn.prepareStatement("SELECT 1, 2 > ?, ?::int, ?::string, ?::string, ?::string, ?::string, ?::string");
		stmt.setInt(1, 3);
		stmt.set%v;

		stmt.setBoolean(3, true);
		stmt.setLong(4, -4L);
		stmt.setFloat(5, 5.31f);
		stmt.setDouble(6, -6.21d);
		stmt.setShort(7, (short)7);

		rs = stmt.executeQuery();
		rs.next();
		a = rs.getInt(1);
		boolean b = rs.getBoolean(2);
		int c = rs.getInt(3);
		String d = rs.getString(4);
		String e = rs.getString(5);
		String f = rs.getString(6);
		String g = rs.getString(7);
		String h = rs.getString(8);
		if (a != 1 || b != false || c != 3 || !d.equals("true") || !e.equals("-4") || !f.startsWith("5.3") || !g.startsWith("-6.2") || !h.equals("7")) {
			throw new Exception("unexpected");
		}

		stmt = conn.prepareStatement("CREATE TABLE accounts (id INT PRIMARY KEY, balance INT, cdate DATE)");
		res = stmt.executeUpdate();
		if (res != 0) {
		    throw new Exception("unexpected: CREATE TABLE reports " + res + " rows changed, expecting 0");
		}

		stmt = conn.prepareStatement("INSERT INTO accounts (id, balance, cdate) VALUES ( ?, ?, ? )");
		stmt.setObject(1, 1);
		stmt.setObject(2, 1000);
		stmt.setObject(3, new java.sql.Date(System.currentTimeMillis()));

		stmt.executeUpdate();

		stmt = conn.prepareStatement("CREATE TABLE empty()");
		res = stmt.executeUpdate();
		if (res != 0) {
		    throw new Exception("unexpected: CREATE TABLE reports " + res + " rows changed, expecting 0");
		}

		stmt = conn.prepareStatement("SELECT * from empty");
		rs = stmt.executeQuery();
		int nCols = rs.getMetaData().getColumnCount();
		if (nCols != 0) {
		    throw new Exception("unexpected: SELECT returns " + nCols + " columns, expected 0");
		}
	}
}
EOF
# See: https://basildoncoder.com/blog/postgresql-jdbc-client-certificates.html
openssl pkcs8 -topk8 -inform PEM -outform DER -in /certs/node.key -out key.pk8 -nocrypt

export PATH=$PATH:/usr/lib/jvm/java-1.8-openjdk/bin
javac main.java
java -cp /postgres.jar:. main
"#;

///////////////////////////////////////////////////////////////////////////////

/// A single `PreparedStatement.set*` call, minus the leading `set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetterCall {
    /// `setInt(index, value)`
    Int { index: u32, value: i32 },
    /// `setString(index, "value")`
    String { index: u32, value: String },
    /// Inserted verbatim
    Raw(String),
}

impl SetterCall {
    pub fn int(index: u32, value: i32) -> Self {
        Self::Int { index, value }
    }

    pub fn string(index: u32, value: impl Into<String>) -> Self {
        Self::String {
            index,
            value: value.into(),
        }
    }
}

impl fmt::Display for SetterCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { index, value } => write!(f, "Int({index}, {value})"),
            Self::String { index, value } => {
                write!(f, "String({index}, \"{}\")", escape_java(value))
            }
            Self::Raw(text) => f.write_str(text),
        }
    }
}

fn escape_java(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template must contain the placeholder %v exactly once, found {found}")]
    PlaceholderCount { found: usize },
}

pub fn placeholder_count(template: &str) -> usize {
    template.matches(PLACEHOLDER).count()
}

pub fn check_template(template: &str) -> Result<(), TemplateError> {
    match placeholder_count(template) {
        1 => Ok(()),
        found => Err(TemplateError::PlaceholderCount { found }),
    }
}

/// Substitutes into an arbitrary template after checking it has exactly one
/// placeholder. The substitution itself is not validated.
pub fn render_template(template: &str, substitution: &str) -> Result<String, TemplateError> {
    check_template(template)?;
    Ok(template.replacen(PLACEHOLDER, substitution, 1))
}

/// Renders [`JAVA_SCRIPT`] with the given setter text.
pub fn render(substitution: &str) -> String {
    JAVA_SCRIPT.replacen(PLACEHOLDER, substitution, 1)
}

pub fn render_setter(setter: &SetterCall) -> String {
    render(&setter.to_string())
}

/// Command line for running a script in the client container.
pub fn shell_command(script: String) -> Vec<String> {
    vec!["/bin/sh".to_owned(), "-c".to_owned(), script]
}

///////////////////////////////////////////////////////////////////////////////
