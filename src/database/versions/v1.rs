pub const VERSION: &str = "1";

pub const CREATE_STATEMENT: &str = r#"
        CREATE TABLE "meta" (
            "key"	TEXT NOT NULL,
            "value"	TEXT,
            PRIMARY KEY("key")
        );

        CREATE TABLE "phone" (
            "number"	TEXT NOT NULL,
            "first_seen"	INTEGER NOT NULL,
            "last_seen"	INTEGER NOT NULL,
            "count"	INTEGER NOT NULL DEFAULT 1,
            "first_user"	INTEGER NOT NULL,
            "first_user_name"	TEXT NOT NULL,
            "users"	TEXT NOT NULL,
            PRIMARY KEY("number")
        );

        CREATE INDEX "phone_last_seen" ON "phone" ("last_seen");
    "#;
