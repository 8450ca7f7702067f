//! Embedded dashboard page
//!
//! A single page driven by Alpine.js that talks to the REST routes of this
//! server. Shipped inside the binary so the server needs no static directory.

pub const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>MLflow Lifecycle</title>
    <script defer src="https://cdn.jsdelivr.net/npm/alpinejs@3.x.x/dist/cdn.min.js"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>[x-cloak]{display:none!important}.tab-active{background-color:rgb(59 130 246);color:white}</style>
</head>
<body class="bg-gray-900 text-gray-100 min-h-screen" x-data="app()">
    <header class="bg-gray-800 border-b border-gray-700 px-6 py-4">
        <div class="flex items-center justify-between">
            <h1 class="text-xl font-bold">MLflow Lifecycle</h1>
            <span class="text-sm text-gray-400" x-text="health.tracking_uri||''"></span>
        </div>
    </header>
    <nav class="bg-gray-800 px-6 py-2 border-b border-gray-700">
        <div class="flex space-x-1">
            <button data-tab="experiments" @click="show('experiments')" :class="tab==='experiments'?'tab-active':'hover:bg-gray-700'" class="px-4 py-2 rounded-md text-sm">Experiments</button>
            <button data-tab="runs" @click="show('runs')" :class="tab==='runs'?'tab-active':'hover:bg-gray-700'" class="px-4 py-2 rounded-md text-sm">Runs</button>
            <button data-tab="models" @click="show('models')" :class="tab==='models'?'tab-active':'hover:bg-gray-700'" class="px-4 py-2 rounded-md text-sm">Models</button>
            <button data-tab="versions" @click="show('versions')" :class="tab==='versions'?'tab-active':'hover:bg-gray-700'" class="px-4 py-2 rounded-md text-sm">Model Versions</button>
            <button data-tab="stages" @click="show('stages')" :class="tab==='stages'?'tab-active':'hover:bg-gray-700'" class="px-4 py-2 rounded-md text-sm">Model Stages</button>
            <button data-tab="deployments" @click="show('deployments')" :class="tab==='deployments'?'tab-active':'hover:bg-gray-700'" class="px-4 py-2 rounded-md text-sm">Deployments</button>
        </div>
    </nav>
    <main class="p-6 space-y-4">
        <div x-show="notice" x-cloak class="rounded p-3" :class="noticeError?'bg-red-800':'bg-green-800'" x-text="notice"></div>

        <div x-show="tab==='experiments'" x-cloak class="bg-gray-800 rounded-lg p-6">
            <div class="flex justify-between mb-4">
                <h2 class="text-lg font-semibold">Experiments</h2>
                <div class="flex space-x-2">
                    <input x-model="form.experimentName" placeholder="Experiment name" class="bg-gray-700 rounded p-2 text-sm">
                    <button @click="createExperiment()" class="px-4 py-2 bg-blue-600 hover:bg-blue-700 rounded text-sm">Create</button>
                </div>
            </div>
            <table class="w-full text-sm">
                <thead><tr class="text-left text-gray-400"><th>ID</th><th>Name</th><th>Stage</th><th></th></tr></thead>
                <tbody>
                    <template x-for="e in experiments" :key="e.id">
                        <tr class="border-t border-gray-700">
                            <td x-text="e.id"></td><td x-text="e.name"></td><td x-text="e.lifecycle_stage"></td>
                            <td class="text-right space-x-2">
                                <button @click="form.experimentId=e.id;show('runs')" class="text-blue-400">Runs</button>
                                <button x-show="e.lifecycle_stage==='active'" @click="deleteExperiment(e.id)" class="text-red-400">Delete</button>
                                <button x-show="e.lifecycle_stage==='deleted'" @click="restoreExperiment(e.id)" class="text-green-400">Restore</button>
                            </td>
                        </tr>
                    </template>
                </tbody>
            </table>
        </div>

        <div x-show="tab==='runs'" x-cloak class="bg-gray-800 rounded-lg p-6">
            <div class="flex justify-between mb-4">
                <h2 class="text-lg font-semibold">Runs</h2>
                <div class="flex space-x-2">
                    <input x-model="form.experimentId" placeholder="Experiment ID" class="bg-gray-700 rounded p-2 text-sm">
                    <input x-model="form.runName" placeholder="Run name" class="bg-gray-700 rounded p-2 text-sm">
                    <button @click="fetchRuns()" class="px-4 py-2 bg-gray-600 hover:bg-gray-500 rounded text-sm">Fetch</button>
                    <button @click="createRun()" class="px-4 py-2 bg-blue-600 hover:bg-blue-700 rounded text-sm">Create</button>
                </div>
            </div>
            <div class="flex space-x-2 mb-4">
                <input x-model="form.runId" placeholder="Run ID" class="bg-gray-700 rounded p-2 text-sm">
                <input x-model="form.key" placeholder="Key" class="bg-gray-700 rounded p-2 text-sm">
                <input x-model="form.value" placeholder="Value" class="bg-gray-700 rounded p-2 text-sm">
                <button @click="logMetric()" class="px-4 py-2 bg-gray-600 hover:bg-gray-500 rounded text-sm">Log metric</button>
                <button @click="logParam()" class="px-4 py-2 bg-gray-600 hover:bg-gray-500 rounded text-sm">Log param</button>
            </div>
            <table class="w-full text-sm">
                <thead><tr class="text-left text-gray-400"><th>Run ID</th><th>Name</th><th>Status</th><th>Metrics</th><th>Params</th><th></th></tr></thead>
                <tbody>
                    <template x-for="r in runs" :key="r.info.run_id">
                        <tr class="border-t border-gray-700">
                            <td class="font-mono" x-text="r.info.run_id"></td>
                            <td x-text="r.info.run_name"></td>
                            <td x-text="r.info.status"></td>
                            <td x-text="r.data.metrics.map(m=>m.key+'='+m.value).join(', ')"></td>
                            <td x-text="r.data.params.map(p=>p.key+'='+p.value).join(', ')"></td>
                            <td class="text-right space-x-2">
                                <button @click="form.runId=r.info.run_id" class="text-blue-400">Select</button>
                                <button @click="deleteRun(r.info.run_id)" class="text-red-400">Delete</button>
                            </td>
                        </tr>
                    </template>
                </tbody>
            </table>
        </div>

        <div x-show="tab==='models'" x-cloak class="bg-gray-800 rounded-lg p-6">
            <div class="flex justify-between mb-4">
                <h2 class="text-lg font-semibold">Registered Models</h2>
                <div class="flex space-x-2">
                    <input x-model="form.modelName" placeholder="Model name" class="bg-gray-700 rounded p-2 text-sm">
                    <input x-model="form.newName" placeholder="New name" class="bg-gray-700 rounded p-2 text-sm">
                    <button @click="createModel()" class="px-4 py-2 bg-blue-600 hover:bg-blue-700 rounded text-sm">Create</button>
                    <button @click="renameModel()" class="px-4 py-2 bg-gray-600 hover:bg-gray-500 rounded text-sm">Rename</button>
                </div>
            </div>
            <table class="w-full text-sm">
                <thead><tr class="text-left text-gray-400"><th>Name</th><th>Description</th><th>Latest versions</th><th></th></tr></thead>
                <tbody>
                    <template x-for="m in models" :key="m.name">
                        <tr class="border-t border-gray-700">
                            <td x-text="m.name"></td>
                            <td x-text="m.description||''"></td>
                            <td x-text="m.latest_versions.map(v=>'v'+v.version+' ('+v.current_stage+')').join(', ')"></td>
                            <td class="text-right space-x-2">
                                <button @click="form.modelName=m.name" class="text-blue-400">Select</button>
                                <button @click="deleteModel(m.name)" class="text-red-400">Delete</button>
                            </td>
                        </tr>
                    </template>
                </tbody>
            </table>
        </div>

        <div x-show="tab==='versions'" x-cloak class="bg-gray-800 rounded-lg p-6">
            <h2 class="text-lg font-semibold mb-4">Model Versions</h2>
            <div class="flex space-x-2 mb-4">
                <input x-model="form.modelName" placeholder="Model name" class="bg-gray-700 rounded p-2 text-sm">
                <input x-model="form.runId" placeholder="Run ID" class="bg-gray-700 rounded p-2 text-sm">
                <input x-model="form.source" placeholder="Source (optional)" class="bg-gray-700 rounded p-2 text-sm">
                <button @click="createVersion()" class="px-4 py-2 bg-blue-600 hover:bg-blue-700 rounded text-sm">Create</button>
            </div>
            <div class="flex space-x-2 mb-4">
                <input x-model="form.version" placeholder="Version" class="bg-gray-700 rounded p-2 text-sm">
                <button @click="getVersion()" class="px-4 py-2 bg-gray-600 hover:bg-gray-500 rounded text-sm">Get</button>
                <button @click="deleteVersion()" class="px-4 py-2 bg-red-700 hover:bg-red-600 rounded text-sm">Delete</button>
            </div>
            <pre class="bg-gray-900 rounded p-4 text-xs overflow-auto" x-show="versionDetail" x-text="JSON.stringify(versionDetail,null,2)"></pre>
        </div>

        <div x-show="tab==='stages'" x-cloak class="bg-gray-800 rounded-lg p-6">
            <h2 class="text-lg font-semibold mb-4">Model Stages</h2>
            <div class="flex space-x-2">
                <input x-model="form.modelName" placeholder="Model name" class="bg-gray-700 rounded p-2 text-sm">
                <input x-model="form.version" placeholder="Version" class="bg-gray-700 rounded p-2 text-sm">
                <select x-model="form.stage" class="bg-gray-700 rounded p-2 text-sm">
                    <option>None</option><option>Staging</option><option>Production</option><option>Archived</option>
                </select>
                <button @click="setStage()" class="px-4 py-2 bg-blue-600 hover:bg-blue-700 rounded text-sm">Set stage</button>
            </div>
        </div>

        <div x-show="tab==='deployments'" x-cloak class="bg-gray-800 rounded-lg p-6">
            <div class="flex justify-between mb-4">
                <h2 class="text-lg font-semibold">Deployments</h2>
                <div class="flex space-x-2">
                    <input x-model="form.deploymentName" placeholder="Deployment name" class="bg-gray-700 rounded p-2 text-sm">
                    <input x-model="form.modelName" placeholder="Model" class="bg-gray-700 rounded p-2 text-sm">
                    <input x-model="form.version" placeholder="Version" class="bg-gray-700 rounded p-2 text-sm">
                    <button @click="createDeployment()" class="px-4 py-2 bg-blue-600 hover:bg-blue-700 rounded text-sm">Deploy</button>
                </div>
            </div>
            <table class="w-full text-sm">
                <thead><tr class="text-left text-gray-400"><th>ID</th><th>Name</th><th>Model</th><th>Version</th><th>Status</th><th>Updated</th><th></th></tr></thead>
                <tbody>
                    <template x-for="d in deployments" :key="d.id">
                        <tr class="border-t border-gray-700">
                            <td x-text="d.id"></td><td x-text="d.name"></td><td x-text="d.model"></td>
                            <td x-text="d.version"></td><td x-text="d.status"></td><td x-text="d.last_updated"></td>
                            <td class="text-right space-x-2">
                                <button @click="fetchLogs(d.id)" class="text-blue-400">Logs</button>
                                <button @click="stopDeployment(d.id)" class="text-red-400">Stop</button>
                            </td>
                        </tr>
                    </template>
                </tbody>
            </table>
            <pre class="bg-gray-900 rounded p-4 mt-4 text-xs overflow-auto" x-show="logs.length" x-text="logs.join('\n')"></pre>
        </div>
    </main>
    <script>
    function app(){return{tab:'experiments',health:{},notice:'',noticeError:false,
    experiments:[],runs:[],models:[],deployments:[],logs:[],versionDetail:null,
    form:{experimentName:'',experimentId:'',runName:'',runId:'',key:'',value:'',modelName:'',newName:'',source:'',version:'',stage:'Staging',deploymentName:''},
    init(){this.call('GET','/health').then(d=>{if(d)this.health=d});this.show('experiments')},
    q(params){return new URLSearchParams(Object.fromEntries(Object.entries(params).filter(([_,v])=>v!==''&&v!=null))).toString()},
    async call(method,url){try{const r=await fetch(url,{method});const d=await r.json();if(!r.ok){this.say(d.message||('HTTP '+r.status),true);return null}if(d&&d.message)this.say(d.message,false);return d}catch(e){this.say(String(e),true);return null}},
    say(msg,err){this.notice=msg;this.noticeError=err;setTimeout(()=>{this.notice=''},4000)},
    show(t){this.tab=t;if(t==='experiments')this.fetchExperiments();if(t==='runs')this.fetchRuns();if(t==='models')this.fetchModels();if(t==='deployments')this.fetchDeployments()},
    async fetchExperiments(){const d=await this.call('GET','/experiments/');if(d)this.experiments=d.experiments},
    async createExperiment(){await this.call('POST','/experiments/create?'+this.q({name:this.form.experimentName}));this.fetchExperiments()},
    async deleteExperiment(id){await this.call('DELETE','/experiments/'+encodeURIComponent(id));this.fetchExperiments()},
    async restoreExperiment(id){await this.call('POST','/experiments/restore/'+encodeURIComponent(id));this.fetchExperiments()},
    async fetchRuns(){const url=this.form.experimentId?'/runs/'+encodeURIComponent(this.form.experimentId):'/runs/';const d=await this.call('GET',url);if(d)this.runs=d.runs},
    async createRun(){await this.call('POST','/runs/create?'+this.q({experiment_id:this.form.experimentId,run_name:this.form.runName}));this.fetchRuns()},
    async deleteRun(id){await this.call('DELETE','/runs/'+encodeURIComponent(id));this.fetchRuns()},
    async logMetric(){await this.call('POST','/runs/'+encodeURIComponent(this.form.runId)+'/log_metric?'+this.q({key:this.form.key,value:this.form.value}));this.fetchRuns()},
    async logParam(){await this.call('POST','/runs/'+encodeURIComponent(this.form.runId)+'/log_param?'+this.q({key:this.form.key,value:this.form.value}));this.fetchRuns()},
    async fetchModels(){const d=await this.call('GET','/models/');if(d)this.models=d.models},
    async createModel(){await this.call('POST','/models/create?'+this.q({name:this.form.modelName}));this.fetchModels()},
    async renameModel(){await this.call('PUT','/models/rename/'+encodeURIComponent(this.form.modelName)+'?'+this.q({new_name:this.form.newName}));this.fetchModels()},
    async deleteModel(name){await this.call('DELETE','/models/delete/'+encodeURIComponent(name));this.fetchModels()},
    async createVersion(){const d=await this.call('POST','/models/version/create/'+encodeURIComponent(this.form.modelName)+'?'+this.q({run_id:this.form.runId,source:this.form.source}));if(d)this.versionDetail=d.model_version},
    async getVersion(){const d=await this.call('GET','/models/version/'+encodeURIComponent(this.form.modelName)+'/'+encodeURIComponent(this.form.version));if(d)this.versionDetail=d.model_version},
    async deleteVersion(){await this.call('DELETE','/models/version/delete/'+encodeURIComponent(this.form.modelName)+'/'+encodeURIComponent(this.form.version));this.versionDetail=null},
    async setStage(){const d=await this.call('POST','/models/set_stage/'+encodeURIComponent(this.form.modelName)+'/'+encodeURIComponent(this.form.version)+'?'+this.q({stage:this.form.stage}));if(d)this.say('Stage set to '+d.model_version.current_stage,false)},
    async fetchDeployments(){const d=await this.call('GET','/deployments/');if(d)this.deployments=d},
    async createDeployment(){await this.call('POST','/deployments/create?'+this.q({name:this.form.deploymentName,model:this.form.modelName,version:this.form.version}));this.fetchDeployments()},
    async stopDeployment(id){await this.call('DELETE','/deployments/'+id);this.fetchDeployments()},
    async fetchLogs(id){const d=await this.call('GET','/deployments/'+id+'/logs');if(d)this.logs=d.logs}}}
    </script>
</body>
</html>"#;
